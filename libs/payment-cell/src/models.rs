// libs/payment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::appointment::PaymentStatus;
use shared_models::error::AppError;
use shared_models::EntityId;

pub const PAYMENT_SUCCESS_NOTE: &str = "Payment processed successfully";
pub const PAYMENT_FAILURE_NOTE: &str = "Payment failed - please try again";
pub const REFUND_NOTE: &str = "Payment refunded";

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    pub appointment_id: EntityId,
    pub amount: f64,
    pub payment_method: String,
}

/// What the gateway is asked to approve.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub appointment_id: EntityId,
    pub patient_id: EntityId,
    pub amount: f64,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDecision {
    Approved,
    Declined { reason: String },
}

impl PaymentDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentDecision::Approved)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub appointment_id: EntityId,
    pub payment_reference: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_notes: Option<String>,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("You can only pay for your own appointments")]
    NotPatient,

    #[error("Only the patient or doctor of this appointment can request a refund")]
    NotParticipant,

    #[error("Invalid payment: {0}")]
    Invalid(String),

    #[error("Appointment is already paid")]
    AlreadyPaid,

    #[error("Only paid appointments can be refunded")]
    NotRefundable,

    #[error("Payment processing failed - please try again")]
    Declined,

    #[error("Appointment was modified concurrently, try again")]
    Conflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            PaymentError::NotPatient | PaymentError::NotParticipant => {
                AppError::Permission(err.to_string())
            }
            PaymentError::Invalid(msg) => AppError::ValidationError(msg),
            PaymentError::AlreadyPaid | PaymentError::NotRefundable | PaymentError::Conflict => {
                AppError::Conflict(err.to_string())
            }
            PaymentError::Declined => AppError::Payment(err.to_string()),
            PaymentError::Store(store) => store.into(),
        }
    }
}
