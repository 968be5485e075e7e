// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::appointment::AppointmentStatus;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::EntityId;

pub const MAX_TITLE_LEN: usize = 100;
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Body accepted by create, `/simple` and the public endpoint. Any `status`
/// sent by the client is read and discarded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<EntityId>,
    pub doctor_id: Option<EntityId>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub appointment_date_time: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub is_video_consultation: Option<bool>,
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

/// Carries no payment fields; those change only through the payment endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub appointment_date_time: Option<DateTime<Utc>>,
    pub is_video_consultation: Option<bool>,
    pub meeting_link: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl UpdateAppointmentRequest {
    /// True when the request touches anything beyond title, description,
    /// notes and the video flag.
    pub fn touches_scheduling(&self) -> bool {
        self.appointment_date_time.is_some() || self.meeting_link.is_some() || self.status.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    #[serde(deserialize_with = "flexible_datetime::required")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime::required")]
    pub end: DateTime<Utc>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(EntityId),

    #[error("Patient not found: {0}")]
    PatientNotFound(EntityId),

    #[error("User {id} is not a {expected}")]
    WrongRole { id: EntityId, expected: Role },

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Appointment was modified concurrently, try again")]
    Conflict,

    #[error("User directory unavailable: {0}")]
    Directory(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::MissingField(_)
            | AppointmentError::DoctorNotFound(_)
            | AppointmentError::PatientNotFound(_)
            | AppointmentError::WrongRole { .. } => AppError::ValidationError(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::Conflict => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Unauthorized(msg) => AppError::Permission(msg),
            AppointmentError::Directory(_) => AppError::ExternalService(err.to_string()),
            AppointmentError::Store(store) => store.into(),
        }
    }
}

// ==============================================================================
// DATE PARSING
// ==============================================================================

/// Accepts RFC 3339 timestamps as well as zone-less `YYYY-MM-DDTHH:MM[:SS]`
/// values, which are read as UTC.
pub mod flexible_datetime {
    use super::*;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date/time '{}'", raw))),
        }
    }

    pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date/time '{}'", raw)))
    }
}
