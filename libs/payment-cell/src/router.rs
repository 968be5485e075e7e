// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;
use crate::services::gateway::PaymentGateway;
use crate::services::processor::PaymentProcessor;

#[derive(Clone)]
pub struct PaymentState {
    pub app: AppState,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl PaymentState {
    pub fn processor(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.app.repository.clone(), self.gateway.clone())
    }
}

pub fn payment_routes(app: AppState, gateway: Arc<dyn PaymentGateway>) -> Router {
    let state = PaymentState { app, gateway };

    let protected_routes = Router::new()
        .route("/process", post(handlers::process_payment))
        .route("/history", get(handlers::payment_history))
        .route("/unpaid", get(handlers::unpaid_appointments))
        .route("/{appointment_id}/refund", post(handlers::refund_payment))
        .layer(middleware::from_fn_with_state(
            state.app.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
