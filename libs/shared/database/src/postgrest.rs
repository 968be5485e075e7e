use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::appointment::{Appointment, NewAppointment};
use shared_models::chat::{ChatMessage, ChatSession, NewChatMessage};
use shared_models::notification::{Notification, NotificationDraft};
use shared_models::records::{
    LabReport, MedicalRecord, NewLabReport, NewMedicalRecord, NewPrescription, Prescription,
};
use shared_models::EntityId;

use crate::repository::{AppointmentFilter, ClinicRepository, RecordFilter, StoreError};
use crate::supabase::SupabaseClient;

const APPOINTMENTS: &str = "appointments";
const NOTIFICATIONS: &str = "notifications";
const CHAT_SESSIONS: &str = "chat_sessions";
const CHAT_MESSAGES: &str = "chat_messages";
const MEDICAL_RECORDS: &str = "medical_records";
const PRESCRIPTIONS: &str = "prescriptions";
const LAB_REPORTS: &str = "lab_reports";

/// Database functions that pair an appointment write with its notification.
const CREATE_APPOINTMENT_RPC: &str = "create_appointment_with_notification";
const UPDATE_APPOINTMENT_RPC: &str = "update_appointment_with_notification";

/// Clinic tables served by Supabase's PostgREST API. Schema and functions
/// live in `libs/shared/database/sql/schema.sql`.
#[derive(Clone)]
pub struct SupabaseRepository {
    client: SupabaseClient,
}

impl SupabaseRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn find<T>(&self, table: &str, id: EntityId) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        Ok(self
            .client
            .select_one(table, &format!("id=eq.{}&select=*", id))
            .await?)
    }

    async fn replace<T>(&self, table: &str, id: EntityId, row: &T) -> Result<Option<T>, StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let mut rows: Vec<T> = self
            .client
            .update(table, &format!("id=eq.{}", id), mutable_columns(row)?)
            .await?;
        Ok(rows.pop())
    }

    async fn remove(&self, table: &str, id: EntityId) -> Result<bool, StoreError> {
        let rows: Vec<Value> = self
            .client
            .delete(table, &format!("id=eq.{}&select=id", id))
            .await?;
        Ok(!rows.is_empty())
    }
}

/// The row as a PATCH body: everything but the key and creation time.
fn mutable_columns<T: Serialize>(row: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(columns) = &mut value {
        columns.remove("id");
        columns.remove("created_at");
    }
    Ok(value)
}

fn timestamp(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339()).into_owned()
}

pub(crate) fn appointment_query(filter: &AppointmentFilter) -> String {
    let mut params = vec!["select=*".to_string()];

    if let Some(id) = filter.patient_id {
        params.push(format!("patient_id=eq.{}", id));
    }
    if let Some(id) = filter.doctor_id {
        params.push(format!("doctor_id=eq.{}", id));
    }
    if let Some(id) = filter.participant_id {
        params.push(format!("or=(patient_id.eq.{id},doctor_id.eq.{id})"));
    }
    if let Some(from) = filter.from {
        params.push(format!("appointment_date_time=gte.{}", timestamp(from)));
    }
    if let Some(until) = filter.until {
        params.push(format!("appointment_date_time=lte.{}", timestamp(until)));
    }
    if let Some(after) = filter.after {
        params.push(format!("appointment_date_time=gt.{}", timestamp(after)));
    }
    if let Some(status) = filter.payment_status {
        params.push(format!("payment_status=eq.{}", status));
    }

    params.push("order=appointment_date_time.asc,id.asc".to_string());
    if let Some(limit) = filter.limit {
        params.push(format!("limit={}", limit));
    }
    params.join("&")
}

pub(crate) fn record_query(filter: &RecordFilter) -> String {
    let scope = match filter {
        RecordFilter::All => None,
        RecordFilter::Patient(id) => Some(format!("patient_id=eq.{}", id)),
        RecordFilter::Doctor {
            doctor_id,
            patient_ids,
        } if patient_ids.is_empty() => Some(format!("doctor_id=eq.{}", doctor_id)),
        RecordFilter::Doctor {
            doctor_id,
            patient_ids,
        } => {
            let patients: Vec<String> = patient_ids.iter().map(|id| id.to_string()).collect();
            Some(format!(
                "or=(doctor_id.eq.{},patient_id.in.({}))",
                doctor_id,
                patients.join(",")
            ))
        }
    };

    match scope {
        Some(scope) => format!("select=*&{}&order=created_at.desc,id.desc", scope),
        None => "select=*&order=created_at.desc,id.desc".to_string(),
    }
}

#[async_trait]
impl ClinicRepository for SupabaseRepository {
    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        notification: Option<NotificationDraft>,
    ) -> Result<Appointment, StoreError> {
        let created = match notification {
            Some(draft) => {
                let args = json!({ "appointment": appointment, "notification": draft });
                self.client.rpc(CREATE_APPOINTMENT_RPC, args).await?
            }
            None => {
                self.client
                    .insert(APPOINTMENTS, serde_json::to_value(&appointment)?)
                    .await?
            }
        };
        Ok(created)
    }

    async fn find_appointment(&self, id: EntityId) -> Result<Option<Appointment>, StoreError> {
        self.find(APPOINTMENTS, id).await
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .client
            .select(APPOINTMENTS, &appointment_query(filter))
            .await?)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_updated_at: DateTime<Utc>,
        notification: Option<NotificationDraft>,
    ) -> Result<Option<Appointment>, StoreError> {
        let changes = mutable_columns(appointment)?;

        let mut rows: Vec<Appointment> = match notification {
            Some(draft) => {
                let args = json!({
                    "appointment_id": appointment.id,
                    "expected_updated_at": expected_updated_at,
                    "changes": changes,
                    "notification": draft,
                });
                self.client.rpc(UPDATE_APPOINTMENT_RPC, args).await?
            }
            None => {
                let filter = format!(
                    "id=eq.{}&updated_at=eq.{}",
                    appointment.id,
                    timestamp(expected_updated_at)
                );
                self.client.update(APPOINTMENTS, &filter, changes).await?
            }
        };

        if rows.is_empty() {
            debug!("Appointment {} changed underneath the update", appointment.id);
        }
        Ok(rows.pop())
    }

    async fn delete_appointment(&self, id: EntityId) -> Result<bool, StoreError> {
        self.remove(APPOINTMENTS, id).await
    }

    async fn payment_reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        let filter = format!(
            "payment_reference=eq.{}&select=id",
            urlencoding::encode(reference)
        );
        let row: Option<Value> = self.client.select_one(APPOINTMENTS, &filter).await?;
        Ok(row.is_some())
    }

    async fn insert_notification(
        &self,
        draft: NotificationDraft,
    ) -> Result<Notification, StoreError> {
        Ok(self
            .client
            .insert(NOTIFICATIONS, serde_json::to_value(&draft)?)
            .await?)
    }

    async fn list_notifications(
        &self,
        user_id: EntityId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let unread = if unread_only { "&is_read=eq.false" } else { "" };
        let query = format!(
            "select=*&user_id=eq.{}{}&order=created_at.desc,id.desc",
            user_id, unread
        );
        Ok(self.client.select(NOTIFICATIONS, &query).await?)
    }

    async fn find_notification(&self, id: EntityId) -> Result<Option<Notification>, StoreError> {
        self.find(NOTIFICATIONS, id).await
    }

    async fn mark_notification_read(
        &self,
        user_id: EntityId,
        id: EntityId,
    ) -> Result<Option<Notification>, StoreError> {
        let mut rows: Vec<Notification> = self
            .client
            .update(
                NOTIFICATIONS,
                &format!("id=eq.{}&user_id=eq.{}", id, user_id),
                json!({ "is_read": true }),
            )
            .await?;
        Ok(rows.pop())
    }

    async fn mark_all_notifications_read(&self, user_id: EntityId) -> Result<usize, StoreError> {
        let rows: Vec<Value> = self
            .client
            .update(
                NOTIFICATIONS,
                &format!("user_id=eq.{}&is_read=eq.false&select=id", user_id),
                json!({ "is_read": true }),
            )
            .await?;
        Ok(rows.len())
    }

    async fn insert_chat_session(&self, user_id: EntityId) -> Result<ChatSession, StoreError> {
        let row = json!({
            "user_id": user_id,
            "start_time": Utc::now(),
            "is_active": true,
        });
        Ok(self.client.insert(CHAT_SESSIONS, row).await?)
    }

    async fn find_chat_session(&self, id: EntityId) -> Result<Option<ChatSession>, StoreError> {
        self.find(CHAT_SESSIONS, id).await
    }

    async fn list_chat_sessions(&self, user_id: EntityId) -> Result<Vec<ChatSession>, StoreError> {
        let query = format!("select=*&user_id=eq.{}&order=start_time.desc,id.desc", user_id);
        Ok(self.client.select(CHAT_SESSIONS, &query).await?)
    }

    async fn update_chat_session(
        &self,
        session: &ChatSession,
    ) -> Result<Option<ChatSession>, StoreError> {
        self.replace(CHAT_SESSIONS, session.id, session).await
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        Ok(self
            .client
            .insert(CHAT_MESSAGES, serde_json::to_value(&message)?)
            .await?)
    }

    async fn list_chat_messages(
        &self,
        session_id: EntityId,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let query = format!(
            "select=*&session_id=eq.{}&order=timestamp.asc,id.asc",
            session_id
        );
        Ok(self.client.select(CHAT_MESSAGES, &query).await?)
    }

    async fn insert_medical_record(
        &self,
        record: NewMedicalRecord,
    ) -> Result<MedicalRecord, StoreError> {
        Ok(self
            .client
            .insert(MEDICAL_RECORDS, serde_json::to_value(&record)?)
            .await?)
    }

    async fn find_medical_record(
        &self,
        id: EntityId,
    ) -> Result<Option<MedicalRecord>, StoreError> {
        self.find(MEDICAL_RECORDS, id).await
    }

    async fn list_medical_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        Ok(self
            .client
            .select(MEDICAL_RECORDS, &record_query(filter))
            .await?)
    }

    async fn update_medical_record(
        &self,
        record: &MedicalRecord,
    ) -> Result<Option<MedicalRecord>, StoreError> {
        self.replace(MEDICAL_RECORDS, record.id, record).await
    }

    /// Prescriptions and lab reports go with it through `on delete cascade`.
    async fn delete_medical_record(&self, id: EntityId) -> Result<bool, StoreError> {
        self.remove(MEDICAL_RECORDS, id).await
    }

    async fn insert_prescription(
        &self,
        prescription: NewPrescription,
    ) -> Result<Prescription, StoreError> {
        Ok(self
            .client
            .insert(PRESCRIPTIONS, serde_json::to_value(&prescription)?)
            .await?)
    }

    async fn find_prescription(&self, id: EntityId) -> Result<Option<Prescription>, StoreError> {
        self.find(PRESCRIPTIONS, id).await
    }

    async fn list_prescriptions(
        &self,
        record_id: EntityId,
    ) -> Result<Vec<Prescription>, StoreError> {
        let query = format!("select=*&medical_record_id=eq.{}&order=id.asc", record_id);
        Ok(self.client.select(PRESCRIPTIONS, &query).await?)
    }

    async fn update_prescription(
        &self,
        prescription: &Prescription,
    ) -> Result<Option<Prescription>, StoreError> {
        self.replace(PRESCRIPTIONS, prescription.id, prescription)
            .await
    }

    async fn delete_prescription(&self, id: EntityId) -> Result<bool, StoreError> {
        self.remove(PRESCRIPTIONS, id).await
    }

    async fn insert_lab_report(&self, report: NewLabReport) -> Result<LabReport, StoreError> {
        Ok(self
            .client
            .insert(LAB_REPORTS, serde_json::to_value(&report)?)
            .await?)
    }

    async fn find_lab_report(&self, id: EntityId) -> Result<Option<LabReport>, StoreError> {
        self.find(LAB_REPORTS, id).await
    }

    async fn list_lab_reports(&self, record_id: EntityId) -> Result<Vec<LabReport>, StoreError> {
        let query = format!("select=*&medical_record_id=eq.{}&order=id.asc", record_id);
        Ok(self.client.select(LAB_REPORTS, &query).await?)
    }

    async fn update_lab_report(
        &self,
        report: &LabReport,
    ) -> Result<Option<LabReport>, StoreError> {
        self.replace(LAB_REPORTS, report.id, report).await
    }

    async fn delete_lab_report(&self, id: EntityId) -> Result<bool, StoreError> {
        self.remove(LAB_REPORTS, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_models::appointment::PaymentStatus;

    #[test]
    fn appointment_query_combines_filters() {
        let filter = AppointmentFilter {
            participant_id: Some(4),
            from: Some(Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()),
            payment_status: Some(PaymentStatus::Paid),
            limit: Some(1),
            ..AppointmentFilter::default()
        };

        assert_eq!(
            appointment_query(&filter),
            "select=*&or=(patient_id.eq.4,doctor_id.eq.4)\
             &appointment_date_time=gte.2030-01-01T09%3A00%3A00%2B00%3A00\
             &payment_status=eq.PAID&order=appointment_date_time.asc,id.asc&limit=1"
        );
    }

    #[test]
    fn doctor_record_query_includes_treated_patients() {
        let filter = RecordFilter::Doctor {
            doctor_id: 2,
            patient_ids: vec![4, 5],
        };
        assert_eq!(
            record_query(&filter),
            "select=*&or=(doctor_id.eq.2,patient_id.in.(4,5))&order=created_at.desc,id.desc"
        );

        let alone = RecordFilter::Doctor {
            doctor_id: 2,
            patient_ids: vec![],
        };
        assert!(record_query(&alone).contains("doctor_id=eq.2"));
    }

    #[test]
    fn patch_body_drops_key_and_creation_time() {
        let session = ChatSession {
            id: 9,
            user_id: 4,
            start_time: Utc::now(),
            end_time: None,
            last_activity_time: None,
            is_active: false,
        };

        let body = mutable_columns(&session).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["is_active"], json!(false));
    }
}
