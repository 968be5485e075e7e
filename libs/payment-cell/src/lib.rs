pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::{payment_routes, PaymentState};
pub use services::gateway::{FixedGateway, PaymentGateway, SimulatedGateway};
pub use services::processor::PaymentProcessor;
