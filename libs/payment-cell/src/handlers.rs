// libs/payment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::extractor::ValidatedJson;

use crate::models::{PaymentReceipt, ProcessPaymentRequest};
use crate::router::PaymentState;

#[axum::debug_handler]
pub async fn process_payment(
    State(state): State<PaymentState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<ProcessPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    actor.require_any(&[Role::Patient])?;
    debug!("Payment request from user {} via {}", actor.id, request.payment_method);

    let appointment = state
        .processor()
        .process_payment(
            request.appointment_id,
            request.amount,
            &request.payment_method,
            &actor,
        )
        .await?;

    let receipt = PaymentReceipt {
        appointment_id: appointment.id,
        payment_reference: appointment.payment_reference,
        payment_status: appointment.payment_status,
        payment_date: appointment.payment_date,
        payment_amount: appointment.payment_amount,
        payment_method: appointment.payment_method,
        payment_notes: appointment.payment_notes,
    };

    Ok(Json(json!({
        "success": true,
        "message": "Payment processed successfully",
        "payment": receipt
    })))
}

#[axum::debug_handler]
pub async fn payment_history(
    State(state): State<PaymentState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    actor.require_any(&[Role::Patient])?;

    let appointments = state.processor().paid_appointments(actor.id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn unpaid_appointments(
    State(state): State<PaymentState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    actor.require_any(&[Role::Patient])?;

    let appointments = state.processor().unpaid_appointments(actor.id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn refund_payment(
    State(state): State<PaymentState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .processor()
        .refund_payment(appointment_id, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment refunded successfully",
        "appointment_id": appointment.id,
        "payment_status": appointment.payment_status,
        "appointment_status": appointment.status
    })))
}
