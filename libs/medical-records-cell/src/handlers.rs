use axum::{
    extract::{Extension, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::extractor::ValidatedJson;

use crate::models::{
    CreateLabReportRequest, CreateMedicalRecordRequest, CreatePrescriptionRequest,
    UpdateLabReportRequest, UpdateMedicalRecordRequest, UpdatePrescriptionRequest,
};
use crate::router::RecordsState;

// ==============================================================================
// MEDICAL RECORDS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_records(
    State(state): State<RecordsState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let records = state.records().list_records(&actor).await?;

    Ok(Json(json!({
        "records": records,
        "total": records.len()
    })))
}

#[axum::debug_handler]
pub async fn create_record(
    State(state): State<RecordsState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<CreateMedicalRecordRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let record = state.records().create_record(request, &actor).await?;

    Ok((StatusCode::CREATED, Json(json!(record))))
}

#[axum::debug_handler]
pub async fn get_record(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let detail = state.records().get_record(record_id, &actor).await?;

    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn update_record(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<UpdateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    let record = state
        .records()
        .update_record(record_id, request, &actor)
        .await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn delete_record(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    state.records().delete_record(record_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Medical record deleted successfully"
    })))
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let prescriptions = state
        .records()
        .list_prescriptions(record_id, &actor)
        .await?;

    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

#[axum::debug_handler]
pub async fn add_prescription(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let prescription = state
        .records()
        .add_prescription(record_id, request, &actor)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(prescription))))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<RecordsState>,
    Path(prescription_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let prescription = state
        .records()
        .get_prescription(prescription_id, &actor)
        .await?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<RecordsState>,
    Path(prescription_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = state
        .records()
        .update_prescription(prescription_id, request, &actor)
        .await?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(state): State<RecordsState>,
    Path(prescription_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    state
        .records()
        .delete_prescription(prescription_id, &actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription deleted successfully"
    })))
}

// ==============================================================================
// LAB REPORTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_lab_reports(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let reports = state
        .lab_reports()
        .list_for_record(record_id, &actor)
        .await?;

    Ok(Json(json!({
        "lab_reports": reports,
        "total": reports.len()
    })))
}

#[axum::debug_handler]
pub async fn create_lab_report(
    State(state): State<RecordsState>,
    Path(record_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<CreateLabReportRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let report = state
        .lab_reports()
        .create_report(record_id, request, &actor)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(report))))
}

#[axum::debug_handler]
pub async fn get_lab_report(
    State(state): State<RecordsState>,
    Path(report_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let report = state.lab_reports().get_report(report_id, &actor).await?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn update_lab_report(
    State(state): State<RecordsState>,
    Path(report_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<UpdateLabReportRequest>,
) -> Result<Json<Value>, AppError> {
    let report = state
        .lab_reports()
        .update_report(report_id, request, &actor)
        .await?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn delete_lab_report(
    State(state): State<RecordsState>,
    Path(report_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<StatusCode, AppError> {
    state.lab_reports().delete_report(report_id, &actor).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_lab_report(
    State(state): State<RecordsState>,
    Path(report_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let attachment = state.lab_reports().download(report_id, &actor).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, attachment.file_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.bytes,
    ))
}
