pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::{lab_report_routes, medical_record_routes, prescription_routes, RecordsState};
pub use services::storage::FileStorage;
