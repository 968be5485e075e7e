use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::EntityId;

// ==============================================================================
// APPOINTMENT ENTITY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub appointment_date_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub is_video_consultation: bool,
    pub meeting_link: Option<String>,
    pub rejection_reason: Option<String>,

    // Payment axis, independent of `status`.
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub payment_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn involves(&self, user_id: EntityId) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.appointment_date_time > now
    }

    /// Moves `updated_at` strictly forward at the database's microsecond
    /// precision, so it can serve as the row version.
    pub fn touch(&mut self) {
        let now = Utc::now().trunc_subsecs(6);
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Columns written when an appointment row is first inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub appointment_date_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub is_video_consultation: bool,
    pub meeting_link: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewAppointment {
    pub fn into_appointment(self, id: EntityId) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            appointment_date_time: self.appointment_date_time,
            title: self.title,
            description: self.description,
            notes: self.notes,
            status: self.status,
            is_video_consultation: self.is_video_consultation,
            meeting_link: self.meeting_link,
            rejection_reason: None,
            payment_amount: None,
            payment_status: self.payment_status,
            payment_method: None,
            payment_date: None,
            payment_reference: None,
            payment_notes: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved", alias = "CONFIRMED", alias = "confirmed")]
    Approved,
    #[serde(alias = "cancelled", alias = "CANCELED", alias = "canceled")]
    Cancelled,
    #[serde(alias = "completed")]
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Approved => write!(f, "APPROVED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "UNPAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}
