use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: EntityId,
    pub medical_record_id: EntityId,
    pub medication_name: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabReport {
    pub id: EntityId,
    pub medical_record_id: EntityId,
    pub test_name: String,
    pub test_results: Option<String>,
    pub test_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl LabReport {
    pub fn has_attachment(&self) -> bool {
        self.file_url.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMedicalRecord {
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewMedicalRecord {
    pub fn into_record(self, id: EntityId) -> MedicalRecord {
        MedicalRecord {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            diagnosis: self.diagnosis,
            treatment: self.treatment,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPrescription {
    pub medical_record_id: EntityId,
    pub medication_name: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl NewPrescription {
    pub fn into_prescription(self, id: EntityId) -> Prescription {
        Prescription {
            id,
            medical_record_id: self.medical_record_id,
            medication_name: self.medication_name,
            dosage: self.dosage,
            instructions: self.instructions,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLabReport {
    pub medical_record_id: EntityId,
    pub test_name: String,
    pub test_results: Option<String>,
    pub test_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl NewLabReport {
    pub fn into_report(self, id: EntityId) -> LabReport {
        LabReport {
            id,
            medical_record_id: self.medical_record_id,
            test_name: self.test_name,
            test_results: self.test_results,
            test_date: self.test_date,
            report_date: self.report_date,
            file_url: self.file_url,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: self.file_size,
            created_at: self.created_at,
        }
    }
}
