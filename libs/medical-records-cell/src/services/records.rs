use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use shared_database::{ClinicRepository, UserDirectory};
use shared_models::auth::{Actor, Role};
use shared_models::records::{
    LabReport, MedicalRecord, NewMedicalRecord, NewPrescription, Prescription,
};
use shared_models::user::UserAccount;
use shared_models::EntityId;

use crate::models::{
    check_date_order, required_text, CreateMedicalRecordRequest, CreatePrescriptionRequest,
    RecordError, UpdateMedicalRecordRequest, UpdatePrescriptionRequest,
};
use crate::services::access::{readable_record, require_staff, visible_records, writable_record};
use crate::services::storage::FileStorage;

/// A record together with everything it owns.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub prescriptions: Vec<Prescription>,
    pub lab_reports: Vec<LabReport>,
}

pub struct MedicalRecordService {
    repository: Arc<dyn ClinicRepository>,
    directory: Arc<dyn UserDirectory>,
    storage: Arc<FileStorage>,
}

impl MedicalRecordService {
    pub fn new(
        repository: Arc<dyn ClinicRepository>,
        directory: Arc<dyn UserDirectory>,
        storage: Arc<FileStorage>,
    ) -> Self {
        Self {
            repository,
            directory,
            storage,
        }
    }

    // ==========================================================================
    // RECORDS
    // ==========================================================================

    pub async fn create_record(
        &self,
        request: CreateMedicalRecordRequest,
        actor: &Actor,
    ) -> Result<MedicalRecord, RecordError> {
        require_staff(actor)?;
        let diagnosis = required_text(&request.diagnosis, "Diagnosis")?;

        let doctor_id = match (request.doctor_id, actor.role) {
            (Some(id), _) => id,
            (None, Role::Doctor) => actor.id,
            (None, _) => return Err(RecordError::MissingField("Doctor ID")),
        };
        if actor.is_doctor() && doctor_id != actor.id {
            return Err(RecordError::Unauthorized(
                "Doctors can only author records in their own name".to_string(),
            ));
        }

        let patient = self
            .resolve_user(request.patient_id, Role::Patient, RecordError::PatientNotFound)
            .await?;
        let doctor = self
            .resolve_user(doctor_id, Role::Doctor, RecordError::DoctorNotFound)
            .await?;

        let now = Utc::now();
        let record = self
            .repository
            .insert_medical_record(NewMedicalRecord {
                patient_id: patient.id,
                doctor_id: doctor.id,
                diagnosis,
                treatment: request.treatment,
                notes: request.notes,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "Medical record {} created for patient {} by user {}",
            record.id, record.patient_id, actor.id
        );
        Ok(record)
    }

    /// Every record the actor may read, newest first.
    pub async fn list_records(&self, actor: &Actor) -> Result<Vec<MedicalRecord>, RecordError> {
        let filter = visible_records(self.repository.as_ref(), actor).await?;
        Ok(self.repository.list_medical_records(&filter).await?)
    }

    pub async fn get_record(
        &self,
        record_id: EntityId,
        actor: &Actor,
    ) -> Result<RecordDetail, RecordError> {
        let record = readable_record(self.repository.as_ref(), record_id, actor).await?;
        let prescriptions = self.repository.list_prescriptions(record_id).await?;
        let lab_reports = self.repository.list_lab_reports(record_id).await?;

        Ok(RecordDetail {
            record,
            prescriptions,
            lab_reports,
        })
    }

    pub async fn update_record(
        &self,
        record_id: EntityId,
        request: UpdateMedicalRecordRequest,
        actor: &Actor,
    ) -> Result<MedicalRecord, RecordError> {
        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(|d| required_text(d, "Diagnosis"))
            .transpose()?;

        let mut record = writable_record(self.repository.as_ref(), record_id, actor).await?;
        if let Some(diagnosis) = diagnosis {
            record.diagnosis = diagnosis;
        }
        if let Some(treatment) = request.treatment {
            record.treatment = Some(treatment);
        }
        if let Some(notes) = request.notes {
            record.notes = Some(notes);
        }
        record.updated_at = Utc::now();

        self.repository
            .update_medical_record(&record)
            .await?
            .ok_or(RecordError::RecordNotFound)
    }

    /// Removes the record with its prescriptions and lab reports, then the
    /// attached files.
    pub async fn delete_record(&self, record_id: EntityId, actor: &Actor) -> Result<(), RecordError> {
        writable_record(self.repository.as_ref(), record_id, actor).await?;

        let files: Vec<String> = self
            .repository
            .list_lab_reports(record_id)
            .await?
            .into_iter()
            .filter_map(|l| l.file_url)
            .collect();

        if !self.repository.delete_medical_record(record_id).await? {
            return Err(RecordError::RecordNotFound);
        }
        self.storage.delete_all(&files).await;

        info!(
            "Medical record {} deleted by user {} ({} files removed)",
            record_id,
            actor.id,
            files.len()
        );
        Ok(())
    }

    // ==========================================================================
    // PRESCRIPTIONS
    // ==========================================================================

    pub async fn list_prescriptions(
        &self,
        record_id: EntityId,
        actor: &Actor,
    ) -> Result<Vec<Prescription>, RecordError> {
        readable_record(self.repository.as_ref(), record_id, actor).await?;
        Ok(self.repository.list_prescriptions(record_id).await?)
    }

    pub async fn add_prescription(
        &self,
        record_id: EntityId,
        request: CreatePrescriptionRequest,
        actor: &Actor,
    ) -> Result<Prescription, RecordError> {
        let medication_name = required_text(&request.medication_name, "Medication name")?;
        let dosage = required_text(&request.dosage, "Dosage")?;
        check_date_order(request.start_date, request.end_date, "Prescription")?;

        writable_record(self.repository.as_ref(), record_id, actor).await?;
        Ok(self
            .repository
            .insert_prescription(NewPrescription {
                medical_record_id: record_id,
                medication_name,
                dosage,
                instructions: request.instructions,
                start_date: request.start_date,
                end_date: request.end_date,
                created_at: Utc::now(),
            })
            .await?)
    }

    pub async fn get_prescription(
        &self,
        prescription_id: EntityId,
        actor: &Actor,
    ) -> Result<Prescription, RecordError> {
        let prescription = self.find_prescription(prescription_id).await?;
        readable_record(self.repository.as_ref(), prescription.medical_record_id, actor).await?;
        Ok(prescription)
    }

    pub async fn update_prescription(
        &self,
        prescription_id: EntityId,
        request: UpdatePrescriptionRequest,
        actor: &Actor,
    ) -> Result<Prescription, RecordError> {
        let medication_name = request
            .medication_name
            .as_deref()
            .map(|m| required_text(m, "Medication name"))
            .transpose()?;
        let dosage = request
            .dosage
            .as_deref()
            .map(|d| required_text(d, "Dosage"))
            .transpose()?;

        let mut prescription = self.find_prescription(prescription_id).await?;
        writable_record(self.repository.as_ref(), prescription.medical_record_id, actor).await?;

        if let Some(name) = medication_name {
            prescription.medication_name = name;
        }
        if let Some(dosage) = dosage {
            prescription.dosage = dosage;
        }
        if let Some(instructions) = request.instructions {
            prescription.instructions = Some(instructions);
        }
        if let Some(start) = request.start_date {
            prescription.start_date = start;
        }
        if let Some(end) = request.end_date {
            prescription.end_date = Some(end);
        }
        check_date_order(prescription.start_date, prescription.end_date, "Prescription")?;

        self.repository
            .update_prescription(&prescription)
            .await?
            .ok_or(RecordError::PrescriptionNotFound)
    }

    pub async fn delete_prescription(
        &self,
        prescription_id: EntityId,
        actor: &Actor,
    ) -> Result<(), RecordError> {
        let prescription = self.find_prescription(prescription_id).await?;
        writable_record(self.repository.as_ref(), prescription.medical_record_id, actor).await?;

        if !self.repository.delete_prescription(prescription_id).await? {
            return Err(RecordError::PrescriptionNotFound);
        }

        info!("Prescription {} deleted by user {}", prescription_id, actor.id);
        Ok(())
    }

    async fn find_prescription(&self, prescription_id: EntityId) -> Result<Prescription, RecordError> {
        self.repository
            .find_prescription(prescription_id)
            .await?
            .ok_or(RecordError::PrescriptionNotFound)
    }

    async fn resolve_user(
        &self,
        id: EntityId,
        expected: Role,
        missing: fn(EntityId) -> RecordError,
    ) -> Result<UserAccount, RecordError> {
        let user = self
            .directory
            .find_by_id(id)
            .await
            .map_err(|e| RecordError::Directory(e.to_string()))?
            .ok_or_else(|| missing(id))?;

        if !user.has_role(expected) {
            return Err(RecordError::WrongRole { id, expected });
        }
        Ok(user)
    }
}
