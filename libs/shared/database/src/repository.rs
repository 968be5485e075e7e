use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::appointment::{Appointment, NewAppointment, PaymentStatus};
use shared_models::chat::{ChatMessage, ChatSession, NewChatMessage};
use shared_models::error::AppError;
use shared_models::notification::{Notification, NotificationDraft};
use shared_models::records::{
    LabReport, MedicalRecord, NewLabReport, NewMedicalRecord, NewPrescription, Prescription,
};
use shared_models::EntityId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database request failed: {0}")]
    Backend(String),

    #[error("unexpected database payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(format!("{:#}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(email) => {
                AppError::Conflict(format!("A user with email {} already exists", email))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Appointment selection. Every set field must match; results are ordered by
/// date/time, then id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub patient_id: Option<EntityId>,
    pub doctor_id: Option<EntityId>,
    /// Either side of the appointment.
    pub participant_id: Option<EntityId>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub until: Option<DateTime<Utc>>,
    /// Exclusive lower bound.
    pub after: Option<DateTime<Utc>>,
    pub payment_status: Option<PaymentStatus>,
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn for_patient(patient_id: EntityId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    pub fn for_doctor(doctor_id: EntityId) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        let when = appointment.appointment_date_time;
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.participant_id.map_or(true, |id| appointment.involves(id))
            && self.from.map_or(true, |from| when >= from)
            && self.until.map_or(true, |until| when <= until)
            && self.after.map_or(true, |after| when > after)
            && self
                .payment_status
                .map_or(true, |status| appointment.payment_status == status)
    }
}

/// Which medical records a listing covers.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    All,
    Patient(EntityId),
    /// Records the doctor wrote plus every record of the listed patients.
    Doctor {
        doctor_id: EntityId,
        patient_ids: Vec<EntityId>,
    },
}

impl RecordFilter {
    pub fn matches(&self, record: &MedicalRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Patient(id) => record.patient_id == *id,
            RecordFilter::Doctor {
                doctor_id,
                patient_ids,
            } => record.doctor_id == *doctor_id || patient_ids.contains(&record.patient_id),
        }
    }
}

/// Persistence for every clinic table except users.
///
/// Updates take the full row and write its mutable columns. Methods that
/// return `Option` yield `None` when no row matched.
#[async_trait]
pub trait ClinicRepository: Send + Sync {
    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    /// Inserts the appointment and, in the same unit of work, the
    /// notification pointing at it.
    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        notification: Option<NotificationDraft>,
    ) -> Result<Appointment, StoreError>;

    async fn find_appointment(&self, id: EntityId) -> Result<Option<Appointment>, StoreError>;

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Writes `appointment` only if the stored row still carries
    /// `expected_updated_at`. The notification is written with it or not at all.
    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_updated_at: DateTime<Utc>,
        notification: Option<NotificationDraft>,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Notifications that referenced the appointment keep existing with the
    /// reference cleared.
    async fn delete_appointment(&self, id: EntityId) -> Result<bool, StoreError>;

    async fn payment_reference_exists(&self, reference: &str) -> Result<bool, StoreError>;

    // ==========================================================================
    // NOTIFICATIONS
    // ==========================================================================

    async fn insert_notification(
        &self,
        draft: NotificationDraft,
    ) -> Result<Notification, StoreError>;

    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: EntityId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn find_notification(&self, id: EntityId) -> Result<Option<Notification>, StoreError>;

    async fn mark_notification_read(
        &self,
        user_id: EntityId,
        id: EntityId,
    ) -> Result<Option<Notification>, StoreError>;

    async fn mark_all_notifications_read(&self, user_id: EntityId) -> Result<usize, StoreError>;

    // ==========================================================================
    // CHAT
    // ==========================================================================

    async fn insert_chat_session(&self, user_id: EntityId) -> Result<ChatSession, StoreError>;

    async fn find_chat_session(&self, id: EntityId) -> Result<Option<ChatSession>, StoreError>;

    /// Newest first.
    async fn list_chat_sessions(&self, user_id: EntityId) -> Result<Vec<ChatSession>, StoreError>;

    async fn update_chat_session(
        &self,
        session: &ChatSession,
    ) -> Result<Option<ChatSession>, StoreError>;

    async fn insert_chat_message(&self, message: NewChatMessage)
        -> Result<ChatMessage, StoreError>;

    /// Oldest first.
    async fn list_chat_messages(&self, session_id: EntityId)
        -> Result<Vec<ChatMessage>, StoreError>;

    // ==========================================================================
    // MEDICAL RECORDS
    // ==========================================================================

    async fn insert_medical_record(
        &self,
        record: NewMedicalRecord,
    ) -> Result<MedicalRecord, StoreError>;

    async fn find_medical_record(&self, id: EntityId)
        -> Result<Option<MedicalRecord>, StoreError>;

    /// Newest first.
    async fn list_medical_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<MedicalRecord>, StoreError>;

    async fn update_medical_record(
        &self,
        record: &MedicalRecord,
    ) -> Result<Option<MedicalRecord>, StoreError>;

    /// Removes the record together with its prescriptions and lab reports.
    async fn delete_medical_record(&self, id: EntityId) -> Result<bool, StoreError>;

    async fn insert_prescription(
        &self,
        prescription: NewPrescription,
    ) -> Result<Prescription, StoreError>;

    async fn find_prescription(&self, id: EntityId) -> Result<Option<Prescription>, StoreError>;

    async fn list_prescriptions(
        &self,
        record_id: EntityId,
    ) -> Result<Vec<Prescription>, StoreError>;

    async fn update_prescription(
        &self,
        prescription: &Prescription,
    ) -> Result<Option<Prescription>, StoreError>;

    async fn delete_prescription(&self, id: EntityId) -> Result<bool, StoreError>;

    async fn insert_lab_report(&self, report: NewLabReport) -> Result<LabReport, StoreError>;

    async fn find_lab_report(&self, id: EntityId) -> Result<Option<LabReport>, StoreError>;

    async fn list_lab_reports(&self, record_id: EntityId) -> Result<Vec<LabReport>, StoreError>;

    async fn update_lab_report(&self, report: &LabReport)
        -> Result<Option<LabReport>, StoreError>;

    async fn delete_lab_report(&self, id: EntityId) -> Result<bool, StoreError>;
}
