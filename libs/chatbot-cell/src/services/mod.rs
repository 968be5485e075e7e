pub mod assistant;
pub mod classifier;
pub mod knowledge;
pub mod responder;
pub mod session;
