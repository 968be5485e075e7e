use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, public_appointment_routes};
use auth_cell::{auth_routes, user_routes};
use chatbot_cell::{chatbot_routes, ChatAssistant};
use medical_records_cell::{
    lab_report_routes, medical_record_routes, prescription_routes, FileStorage, RecordsState,
};
use notification_cell::notification_routes;
use payment_cell::{payment_routes, PaymentGateway};
use shared_utils::AppState;

/// Everything the cell routers are built from.
pub struct Services {
    pub app: AppState,
    pub gateway: Arc<dyn PaymentGateway>,
    pub assistant: Arc<ChatAssistant>,
    pub storage: Arc<FileStorage>,
}

pub fn create_router(services: Services) -> Router {
    let Services {
        app,
        gateway,
        assistant,
        storage,
    } = services;
    let records = RecordsState::new(app.clone(), storage);

    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(app.clone()))
        .nest("/api/users", user_routes(app.clone()))
        .nest("/api/appointments", appointment_routes(app.clone()))
        .nest("/api/public/appointments", public_appointment_routes(app.clone()))
        .nest("/api/payments", payment_routes(app.clone(), gateway))
        .nest("/api/notifications", notification_routes(app.clone()))
        .nest("/api/chatbot", chatbot_routes(app, assistant))
        .nest("/api/medical-records", medical_record_routes(records.clone()))
        .nest("/api/prescriptions", prescription_routes(records.clone()))
        .nest("/api/lab-reports", lab_report_routes(records))
}
