pub mod gateway;
pub mod processor;
