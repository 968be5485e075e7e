pub mod emitter;
pub mod inbox;
