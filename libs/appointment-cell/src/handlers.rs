// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::extractor::ValidatedJson;
use shared_utils::AppState;

use crate::models::{
    CreateAppointmentRequest, DateRangeQuery, RejectAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.list_all(&actor).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn appointments_by_date_range(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service
        .list_by_date_range(range.start, range.end, &actor)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.my_appointments(&actor).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn my_upcoming_appointments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.my_upcoming_appointments(&actor).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service
        .appointments_for_doctor(doctor_id, &actor)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .get_appointment(appointment_id, &actor)
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// COMMANDS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .create_appointment(request, Some(&actor))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment requested successfully"
        })),
    ))
}

/// Authentication is optional here; anonymous callers must name the patient.
#[axum::debug_handler]
pub async fn create_simple_appointment(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = actor.map(|Extension(actor)| actor);
    if actor.is_none() {
        debug!("Simple appointment request without authentication");
    }

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .create_appointment(request, actor.as_ref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn create_public_appointment(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Both IDs are required before any directory lookup.
    if request.doctor_id.is_none() {
        return Err(AppError::ValidationError("Doctor ID is required".to_string()));
    }
    if request.patient_id.is_none() {
        return Err(AppError::ValidationError("Patient ID is required".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.create_appointment(request, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .update_appointment(appointment_id, request, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    booking_service
        .delete_appointment(appointment_id, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .confirm_appointment(appointment_id, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    request: Option<Json<RejectAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let reason = request.and_then(|Json(body)| body.reason);

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .reject_appointment(appointment_id, &actor, reason.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rejected"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .complete_appointment(appointment_id, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}
