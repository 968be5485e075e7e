// libs/medical-records-cell/src/models.rs
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::EntityId;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Request body cap for lab report writes: a maximum-size file in base64
/// plus room for the surrounding JSON fields.
pub const MAX_UPLOAD_BODY: usize = (MAX_FILE_SIZE as usize + 2) / 3 * 4 + 64 * 1024;

pub const ALLOWED_FILE_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/jpg", "image/png"];

// ==============================================================================
// MEDICAL RECORDS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: EntityId,
    /// Defaults to the acting doctor.
    pub doctor_id: Option<EntityId>,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMedicalRecordRequest {
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub medication_name: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ==============================================================================
// LAB REPORTS
// ==============================================================================

/// A file sent inline as base64, optionally in `data:<type>;base64,` form.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabReportRequest {
    pub test_name: String,
    pub test_results: Option<String>,
    pub test_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub file: Option<FileUpload>,
}

/// A new `file` replaces any existing attachment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLabReportRequest {
    pub test_name: Option<String>,
    pub test_results: Option<String>,
    pub test_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub file: Option<FileUpload>,
}

/// Where an upload ended up on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: String,
    pub file_name: String,
    pub file_type: String,
    pub size: u64,
}

pub struct Attachment {
    pub file_name: String,
    pub file_type: String,
    pub bytes: Vec<u8>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Medical record not found")]
    RecordNotFound,

    #[error("Prescription not found")]
    PrescriptionNotFound,

    #[error("Lab report not found")]
    LabReportNotFound,

    #[error("Lab report has no attached file")]
    NoAttachment,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(EntityId),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(EntityId),

    #[error("User {id} is not a {expected}")]
    WrongRole { id: EntityId, expected: Role },

    #[error("{0}")]
    Unauthorized(String),

    #[error("User directory unavailable: {0}")]
    Directory(String),

    #[error("File storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::RecordNotFound
            | RecordError::PrescriptionNotFound
            | RecordError::LabReportNotFound
            | RecordError::NoAttachment => AppError::NotFound(err.to_string()),
            RecordError::MissingField(_)
            | RecordError::InvalidFile(_)
            | RecordError::PatientNotFound(_)
            | RecordError::DoctorNotFound(_)
            | RecordError::WrongRole { .. } => AppError::ValidationError(err.to_string()),
            RecordError::ValidationError(msg) => AppError::ValidationError(msg),
            RecordError::Unauthorized(msg) => AppError::Permission(msg),
            RecordError::Directory(_) => AppError::ExternalService(err.to_string()),
            RecordError::Storage(msg) => AppError::Internal(msg),
            RecordError::Store(store) => store.into(),
        }
    }
}

/// Trims and rejects blank values of a required text field.
pub fn required_text(value: &str, field: &'static str) -> Result<String, RecordError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RecordError::MissingField(field));
    }
    Ok(value.to_string())
}

pub fn check_date_order(start: NaiveDate, end: Option<NaiveDate>, what: &str) -> Result<(), RecordError> {
    match end {
        Some(end) if end < start => Err(RecordError::ValidationError(format!(
            "{} end date must not be before its start date",
            what
        ))),
        _ => Ok(()),
    }
}
