use shared_database::{AppointmentFilter, ClinicRepository, RecordFilter};
use shared_models::auth::{Actor, Role};
use shared_models::records::MedicalRecord;
use shared_models::EntityId;

use crate::models::RecordError;

/// Who may see a medical record: admins always, patients their own, doctors
/// the records they wrote or those of patients they have an appointment with.
pub async fn can_read(
    repository: &dyn ClinicRepository,
    record: &MedicalRecord,
    actor: &Actor,
) -> Result<bool, RecordError> {
    Ok(match actor.role {
        Role::Admin => true,
        Role::Patient => record.patient_id == actor.id,
        Role::Doctor => {
            record.doctor_id == actor.id || treats(repository, actor.id, record.patient_id).await?
        }
    })
}

pub fn require_staff(actor: &Actor) -> Result<(), RecordError> {
    if actor.is_patient() {
        return Err(RecordError::Unauthorized(
            "Only doctors and administrators can modify medical records".to_string(),
        ));
    }
    Ok(())
}

async fn treats(
    repository: &dyn ClinicRepository,
    doctor_id: EntityId,
    patient_id: EntityId,
) -> Result<bool, RecordError> {
    let filter = AppointmentFilter {
        doctor_id: Some(doctor_id),
        patient_id: Some(patient_id),
        limit: Some(1),
        ..AppointmentFilter::default()
    };
    Ok(!repository.list_appointments(&filter).await?.is_empty())
}

/// The listing scope for `actor`. A doctor's scope is widened by every
/// patient they hold an appointment with.
pub async fn visible_records(
    repository: &dyn ClinicRepository,
    actor: &Actor,
) -> Result<RecordFilter, RecordError> {
    Ok(match actor.role {
        Role::Admin => RecordFilter::All,
        Role::Patient => RecordFilter::Patient(actor.id),
        Role::Doctor => {
            let mut patient_ids: Vec<EntityId> = repository
                .list_appointments(&AppointmentFilter::for_doctor(actor.id))
                .await?
                .into_iter()
                .map(|a| a.patient_id)
                .collect();
            patient_ids.sort_unstable();
            patient_ids.dedup();
            RecordFilter::Doctor {
                doctor_id: actor.id,
                patient_ids,
            }
        }
    })
}

/// Looks a record up and checks read access. Unreadable records are reported
/// as forbidden, unknown ones as not found.
pub async fn readable_record(
    repository: &dyn ClinicRepository,
    record_id: EntityId,
    actor: &Actor,
) -> Result<MedicalRecord, RecordError> {
    let record = repository
        .find_medical_record(record_id)
        .await?
        .ok_or(RecordError::RecordNotFound)?;

    if !can_read(repository, &record, actor).await? {
        return Err(RecordError::Unauthorized(
            "Not authorized to access this medical record".to_string(),
        ));
    }
    Ok(record)
}

/// Writers are doctors and admins that can also read the record.
pub async fn writable_record(
    repository: &dyn ClinicRepository,
    record_id: EntityId,
    actor: &Actor,
) -> Result<MedicalRecord, RecordError> {
    require_staff(actor)?;
    readable_record(repository, record_id, actor).await
}
