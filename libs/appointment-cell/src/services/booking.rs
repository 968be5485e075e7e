// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_database::{AppointmentFilter, ClinicRepository, UserDirectory};
use shared_models::appointment::{Appointment, AppointmentStatus, NewAppointment, PaymentStatus};
use shared_models::auth::{Actor, Role};
use shared_models::notification::{NotificationDraft, NotificationType};
use shared_models::user::UserAccount;
use shared_models::EntityId;
use shared_utils::AppState;

use notification_cell::NotificationEmitter;

use crate::models::{
    AppointmentError, CreateAppointmentRequest, UpdateAppointmentRequest, MAX_TITLE_LEN,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Attempts at a versioned write before a concurrent editor wins.
const MAX_WRITE_ATTEMPTS: usize = 3;

pub struct AppointmentBookingService {
    repository: Arc<dyn ClinicRepository>,
    directory: Arc<dyn UserDirectory>,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self::with_parts(state.repository.clone(), state.directory.clone())
    }

    pub fn with_parts(
        repository: Arc<dyn ClinicRepository>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            repository,
            directory,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    // ==========================================================================
    // COMMANDS
    // ==========================================================================

    /// Creates a PENDING appointment and notifies the doctor.
    ///
    /// With no actor the caller is anonymous and must name the patient.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor: Option<&Actor>,
    ) -> Result<Appointment, AppointmentError> {
        let title = validate_title(request.title.as_deref())?
            .ok_or(AppointmentError::MissingField("Title"))?;
        let appointment_date_time = request
            .appointment_date_time
            .ok_or(AppointmentError::MissingField("Appointment date/time"))?;
        let doctor_id = request.doctor_id.ok_or(AppointmentError::MissingField("Doctor ID"))?;

        let patient_id = match actor {
            Some(actor) if actor.is_patient() => {
                if request.patient_id.is_some_and(|id| id != actor.id) {
                    debug!("Ignoring patient_id supplied by patient {}", actor.id);
                }
                actor.id
            }
            _ => request.patient_id.ok_or(AppointmentError::MissingField("Patient ID"))?,
        };

        if request.status.is_some() {
            debug!("Ignoring client supplied status on create");
        }

        let doctor = self
            .resolve_user(doctor_id, Role::Doctor, AppointmentError::DoctorNotFound)
            .await?;
        let patient = self
            .resolve_user(patient_id, Role::Patient, AppointmentError::PatientNotFound)
            .await?;

        let now = Utc::now();
        let new = NewAppointment {
            patient_id: patient.id,
            doctor_id: doctor.id,
            appointment_date_time,
            title,
            description: request.description,
            notes: request.notes,
            status: AppointmentStatus::Pending,
            is_video_consultation: request.is_video_consultation.unwrap_or(false),
            meeting_link: request.meeting_link,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };

        let draft = NotificationDraft::new(
            doctor.id,
            "New Appointment Request",
            format!(
                "{} requested \"{}\" on {}",
                patient.full_name(),
                new.title,
                new.appointment_date_time.format("%Y-%m-%d %H:%M UTC")
            ),
            NotificationType::AppointmentRequested,
        );

        let appointment = self
            .repository
            .insert_appointment(new, NotificationEmitter::best_effort(draft))
            .await?;

        info!(
            "Appointment {} created for patient {} with doctor {}",
            appointment.id, appointment.patient_id, appointment.doctor_id
        );
        Ok(appointment)
    }

    pub async fn confirm_appointment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, AppointmentStatus::Approved, None)
            .await
    }

    pub async fn reject_appointment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, AppointmentStatus::Cancelled, reason)
            .await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, AppointmentStatus::Completed, None)
            .await
    }

    async fn transition(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
        new_status: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        require_staff(actor)?;

        self.modify(appointment_id, |appointment| {
            if actor.is_doctor() && appointment.doctor_id != actor.id {
                return Err(AppointmentError::Unauthorized(
                    "Doctors can only manage their own appointments".to_string(),
                ));
            }
            self.lifecycle.apply_transition(appointment, new_status, reason)
        })
        .await
    }

    /// Field overwrite. Patients may edit descriptive fields of their own
    /// appointments, doctors their own appointments, admins any.
    pub async fn update_appointment(
        &self,
        appointment_id: EntityId,
        request: UpdateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let title = validate_title(request.title.as_deref())?;

        if actor.is_patient() && request.touches_scheduling() {
            return Err(AppointmentError::Unauthorized(
                "Patients may only change the title, description, notes and video preference"
                    .to_string(),
            ));
        }

        let appointment = self
            .modify(appointment_id, |appointment| {
                let allowed = match actor.role {
                    Role::Admin => true,
                    Role::Doctor => appointment.doctor_id == actor.id,
                    Role::Patient => appointment.patient_id == actor.id,
                };
                if !allowed {
                    return Err(AppointmentError::Unauthorized(
                        "Not authorized to update this appointment".to_string(),
                    ));
                }

                if let Some(title) = &title {
                    appointment.title = title.clone();
                }
                if let Some(description) = &request.description {
                    appointment.description = Some(description.clone());
                }
                if let Some(notes) = &request.notes {
                    appointment.notes = Some(notes.clone());
                }
                if let Some(when) = request.appointment_date_time {
                    appointment.appointment_date_time = when;
                }
                if let Some(video) = request.is_video_consultation {
                    appointment.is_video_consultation = video;
                }
                if let Some(link) = &request.meeting_link {
                    appointment.meeting_link = Some(link.clone());
                }

                match request.status {
                    Some(status) if status != appointment.status => {
                        self.lifecycle.apply_transition(appointment, status, None)
                    }
                    _ => Ok(None),
                }
            })
            .await?;

        info!("Appointment {} updated by user {}", appointment_id, actor.id);
        Ok(appointment)
    }

    /// Hard delete. Notifications keep existing with their reference cleared.
    pub async fn delete_appointment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
    ) -> Result<(), AppointmentError> {
        require_staff(actor)?;

        let appointment = self
            .repository
            .find_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if actor.is_doctor() && appointment.doctor_id != actor.id {
            return Err(AppointmentError::Unauthorized(
                "Doctors can only delete their own appointments".to_string(),
            ));
        }

        if !self.repository.delete_appointment(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted by user {}", appointment_id, actor.id);
        Ok(())
    }

    /// Re-reads the row, lets `change` edit it and writes it back only if no
    /// one else wrote in between; a lost race is retried against fresh data.
    async fn modify<F>(
        &self,
        appointment_id: EntityId,
        mut change: F,
    ) -> Result<Appointment, AppointmentError>
    where
        F: FnMut(&mut Appointment) -> Result<Option<NotificationDraft>, AppointmentError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .repository
                .find_appointment(appointment_id)
                .await?
                .ok_or(AppointmentError::NotFound)?;

            let mut next = current.clone();
            let draft = change(&mut next)?.and_then(NotificationEmitter::best_effort);
            next.touch();

            if let Some(updated) = self
                .repository
                .update_appointment(&next, current.updated_at, draft)
                .await?
            {
                return Ok(updated);
            }
            debug!(
                "Appointment {} changed concurrently (attempt {}), re-reading",
                appointment_id, attempt
            );
        }

        warn!("Giving up on appointment {} after repeated write conflicts", appointment_id);
        Err(AppointmentError::Conflict)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .repository
            .find_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if !actor.is_admin() && !appointment.involves(actor.id) {
            return Err(AppointmentError::Unauthorized(
                "Not authorized to view this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<Appointment>, AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Unauthorized(
                "Only administrators can list all appointments".to_string(),
            ));
        }
        self.select(AppointmentFilter::default()).await
    }

    /// Inclusive on both ends. Non-admins only see appointments they take part in.
    pub async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if start > end {
            return Err(AppointmentError::ValidationError(
                "start must not be after end".to_string(),
            ));
        }

        self.select(AppointmentFilter {
            from: Some(start),
            until: Some(end),
            participant_id: (!actor.is_admin()).then_some(actor.id),
            ..AppointmentFilter::default()
        })
        .await
    }

    pub async fn my_appointments(&self, actor: &Actor) -> Result<Vec<Appointment>, AppointmentError> {
        self.select(own_scope(actor)?.filter()).await
    }

    /// Strictly after now, soonest first.
    pub async fn my_upcoming_appointments(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.select(AppointmentFilter {
            after: Some(Utc::now()),
            ..own_scope(actor)?.filter()
        })
        .await
    }

    pub async fn appointments_for_doctor(
        &self,
        doctor_id: EntityId,
        actor: &Actor,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let allowed = actor.is_admin() || (actor.is_doctor() && actor.id == doctor_id);
        if !allowed {
            return Err(AppointmentError::Unauthorized(
                "Only administrators or the doctor themself can list these appointments"
                    .to_string(),
            ));
        }
        self.select(AppointmentFilter::for_doctor(doctor_id)).await
    }

    async fn select(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.repository.list_appointments(&filter).await?)
    }

    async fn resolve_user(
        &self,
        id: EntityId,
        expected: Role,
        missing: fn(EntityId) -> AppointmentError,
    ) -> Result<UserAccount, AppointmentError> {
        let user = self
            .directory
            .find_by_id(id)
            .await
            .map_err(|e| AppointmentError::Directory(e.to_string()))?
            .ok_or_else(|| missing(id))?;

        if !user.has_role(expected) {
            return Err(AppointmentError::WrongRole { id, expected });
        }
        Ok(user)
    }
}

fn require_staff(actor: &Actor) -> Result<(), AppointmentError> {
    if actor.is_doctor() || actor.is_admin() {
        Ok(())
    } else {
        Err(AppointmentError::Unauthorized(
            "Only doctors and administrators can perform this action".to_string(),
        ))
    }
}

/// Whose appointments count as "mine".
#[derive(Debug, Clone, Copy)]
enum OwnScope {
    Patient(EntityId),
    Doctor(EntityId),
}

impl OwnScope {
    fn filter(self) -> AppointmentFilter {
        match self {
            OwnScope::Patient(id) => AppointmentFilter::for_patient(id),
            OwnScope::Doctor(id) => AppointmentFilter::for_doctor(id),
        }
    }
}

fn own_scope(actor: &Actor) -> Result<OwnScope, AppointmentError> {
    match actor.role {
        Role::Patient => Ok(OwnScope::Patient(actor.id)),
        Role::Doctor => Ok(OwnScope::Doctor(actor.id)),
        Role::Admin => Err(AppointmentError::Unauthorized(
            "Only doctors and patients have personal appointment lists".to_string(),
        )),
    }
}

/// Returns the trimmed title, or `None` when the field was not sent.
fn validate_title(title: Option<&str>) -> Result<Option<String>, AppointmentError> {
    let Some(title) = title else {
        return Ok(None);
    };

    let title = title.trim();
    if title.is_empty() {
        return Err(AppointmentError::MissingField("Title"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppointmentError::ValidationError(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(Some(title.to_string()))
}
