// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::notification::{NotificationDraft, NotificationType};

use crate::models::{AppointmentError, DEFAULT_REJECTION_REASON};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status.is_terminal() {
            warn!("Appointment already {}, refusing move to {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Approved,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Approved => vec![AppointmentStatus::Completed],
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => vec![],
        }
    }

    /// Moves `appointment` to `new_status` and returns the notification the
    /// change should produce, if any. Payment fields are left alone.
    pub fn apply_transition(
        &self,
        appointment: &mut Appointment,
        new_status: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Option<NotificationDraft>, AppointmentError> {
        let previous = appointment.status;
        self.validate_status_transition(&previous, &new_status)?;

        appointment.status = new_status;
        appointment.touch();

        let when = appointment.appointment_date_time.format("%Y-%m-%d %H:%M UTC");
        let draft = match new_status {
            AppointmentStatus::Approved => Some(NotificationDraft::new(
                appointment.patient_id,
                "Appointment Confirmed",
                format!(
                    "Your appointment \"{}\" on {} has been confirmed.",
                    appointment.title, when
                ),
                NotificationType::AppointmentConfirmed,
            )),
            AppointmentStatus::Cancelled => {
                let reason = reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_REJECTION_REASON)
                    .to_string();
                let message = format!(
                    "Your appointment \"{}\" on {} was rejected. Reason: {}",
                    appointment.title, when, reason
                );
                appointment.rejection_reason = Some(reason);
                Some(NotificationDraft::new(
                    appointment.patient_id,
                    "Appointment Rejected",
                    message,
                    NotificationType::AppointmentRejected,
                ))
            }
            AppointmentStatus::Completed | AppointmentStatus::Pending => None,
        };

        info!(
            "Appointment {} moved {} -> {}",
            appointment.id, previous, new_status
        );
        Ok(draft.map(|d| d.for_appointment(appointment.id)))
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
