use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shared_models::appointment::{Appointment, NewAppointment};
use shared_models::chat::{ChatMessage, ChatSession, NewChatMessage};
use shared_models::notification::{Notification, NotificationDraft};
use shared_models::records::{
    LabReport, MedicalRecord, NewLabReport, NewMedicalRecord, NewPrescription, Prescription,
};
use shared_models::user::UserAccount;
use shared_models::EntityId;

use crate::directory::UserDirectory;
use crate::repository::{AppointmentFilter, ClinicRepository, RecordFilter, StoreError};

/// Rows keyed by an auto-increment id.
#[derive(Debug)]
struct Table<T> {
    next_id: EntityId,
    rows: BTreeMap<EntityId, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(EntityId) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn insert_at(&mut self, id: EntityId, row: T) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        self.rows.insert(id, row);
    }

    fn get(&self, id: EntityId) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    /// Overwrites an existing row; returns the stored copy.
    fn replace(&mut self, id: EntityId, row: &T) -> Option<T> {
        let slot = self.rows.get_mut(&id)?;
        *slot = row.clone();
        Some(row.clone())
    }

    fn remove(&mut self, id: EntityId) -> bool {
        self.rows.remove(&id).is_some()
    }

    fn filtered(&self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|row| keep(row)).cloned().collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<UserAccount>,
    appointments: Table<Appointment>,
    notifications: Table<Notification>,
    chat_sessions: Table<ChatSession>,
    chat_messages: Table<ChatMessage>,
    medical_records: Table<MedicalRecord>,
    prescriptions: Table<Prescription>,
    lab_reports: Table<LabReport>,
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<&UserAccount> {
        self.users
            .rows
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }
}

/// In-process repository and user directory for tests and local tooling.
///
/// Each call holds the lock for its own duration only, so every method is
/// atomic and nothing spans calls.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts directory users keeping their ids. Existing ids are overwritten.
    pub async fn seed_users(&self, users: Vec<UserAccount>) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(clash) = users.iter().find(|user| {
            tables
                .user_by_email(&user.email)
                .is_some_and(|existing| existing.id != user.id)
        }) {
            return Err(StoreError::DuplicateEmail(clash.email.clone()));
        }

        let count = users.len();
        for user in users {
            tables.users.insert_at(user.id, user);
        }
        Ok(count)
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.rows.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryRepository {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<UserAccount>> {
        Ok(self.tables.read().await.users.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        Ok(self.tables.read().await.user_by_email(email).cloned())
    }
}

fn newest_first<T>(rows: &mut [T], created: impl Fn(&T) -> (DateTime<Utc>, EntityId)) {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
}

#[async_trait]
impl ClinicRepository for MemoryRepository {
    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        notification: Option<NotificationDraft>,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .insert_with(|id| appointment.into_appointment(id));

        if let Some(draft) = notification {
            let draft = draft.for_appointment(appointment.id);
            let now = Utc::now();
            tables
                .notifications
                .insert_with(|id| draft.into_notification(id, now));
        }
        Ok(appointment)
    }

    async fn find_appointment(&self, id: EntityId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(id))
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut appointments = self
            .tables
            .read()
            .await
            .appointments
            .filtered(|a| filter.matches(a));

        appointments.sort_by(|a, b| {
            a.appointment_date_time
                .cmp(&b.appointment_date_time)
                .then(a.id.cmp(&b.id))
        });
        if let Some(limit) = filter.limit {
            appointments.truncate(limit);
        }
        Ok(appointments)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected_updated_at: DateTime<Utc>,
        notification: Option<NotificationDraft>,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut tables = self.tables.write().await;

        let unchanged = tables
            .appointments
            .rows
            .get(&appointment.id)
            .is_some_and(|row| row.updated_at == expected_updated_at);
        if !unchanged {
            return Ok(None);
        }

        let updated = tables.appointments.replace(appointment.id, appointment);
        if let Some(draft) = notification {
            let now = Utc::now();
            tables
                .notifications
                .insert_with(|id| draft.into_notification(id, now));
        }
        Ok(updated)
    }

    async fn delete_appointment(&self, id: EntityId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.appointments.remove(id) {
            return Ok(false);
        }

        for notification in tables.notifications.rows.values_mut() {
            if notification.related_appointment_id == Some(id) {
                notification.related_appointment_id = None;
            }
        }
        Ok(true)
    }

    async fn payment_reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .appointments
            .rows
            .values()
            .any(|a| a.payment_reference.as_deref() == Some(reference)))
    }

    async fn insert_notification(
        &self,
        draft: NotificationDraft,
    ) -> Result<Notification, StoreError> {
        let now = Utc::now();
        Ok(self
            .tables
            .write()
            .await
            .notifications
            .insert_with(|id| draft.into_notification(id, now)))
    }

    async fn list_notifications(
        &self,
        user_id: EntityId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut notifications = self
            .tables
            .read()
            .await
            .notifications
            .filtered(|n| n.user_id == user_id && (!unread_only || !n.is_read));

        newest_first(&mut notifications, |n| (n.created_at, n.id));
        Ok(notifications)
    }

    async fn find_notification(&self, id: EntityId) -> Result<Option<Notification>, StoreError> {
        Ok(self.tables.read().await.notifications.get(id))
    }

    async fn mark_notification_read(
        &self,
        user_id: EntityId,
        id: EntityId,
    ) -> Result<Option<Notification>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .notifications
            .rows
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    async fn mark_all_notifications_read(&self, user_id: EntityId) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for notification in tables.notifications.rows.values_mut() {
            if notification.user_id == user_id && !notification.is_read {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn insert_chat_session(&self, user_id: EntityId) -> Result<ChatSession, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .chat_sessions
            .insert_with(|id| ChatSession {
                id,
                user_id,
                start_time: Utc::now(),
                end_time: None,
                last_activity_time: None,
                is_active: true,
            }))
    }

    async fn find_chat_session(&self, id: EntityId) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.tables.read().await.chat_sessions.get(id))
    }

    async fn list_chat_sessions(&self, user_id: EntityId) -> Result<Vec<ChatSession>, StoreError> {
        let mut sessions = self
            .tables
            .read()
            .await
            .chat_sessions
            .filtered(|s| s.user_id == user_id);

        newest_first(&mut sessions, |s| (s.start_time, s.id));
        Ok(sessions)
    }

    async fn update_chat_session(
        &self,
        session: &ChatSession,
    ) -> Result<Option<ChatSession>, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .chat_sessions
            .replace(session.id, session))
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .chat_messages
            .insert_with(|id| message.into_message(id)))
    }

    async fn list_chat_messages(
        &self,
        session_id: EntityId,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages = self
            .tables
            .read()
            .await
            .chat_messages
            .filtered(|m| m.session_id == session_id);

        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn insert_medical_record(
        &self,
        record: NewMedicalRecord,
    ) -> Result<MedicalRecord, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .medical_records
            .insert_with(|id| record.into_record(id)))
    }

    async fn find_medical_record(
        &self,
        id: EntityId,
    ) -> Result<Option<MedicalRecord>, StoreError> {
        Ok(self.tables.read().await.medical_records.get(id))
    }

    async fn list_medical_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        let mut records = self
            .tables
            .read()
            .await
            .medical_records
            .filtered(|r| filter.matches(r));

        newest_first(&mut records, |r| (r.created_at, r.id));
        Ok(records)
    }

    async fn update_medical_record(
        &self,
        record: &MedicalRecord,
    ) -> Result<Option<MedicalRecord>, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .medical_records
            .replace(record.id, record))
    }

    async fn delete_medical_record(&self, id: EntityId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.medical_records.remove(id) {
            return Ok(false);
        }
        tables
            .prescriptions
            .rows
            .retain(|_, p| p.medical_record_id != id);
        tables
            .lab_reports
            .rows
            .retain(|_, l| l.medical_record_id != id);
        Ok(true)
    }

    async fn insert_prescription(
        &self,
        prescription: NewPrescription,
    ) -> Result<Prescription, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .prescriptions
            .insert_with(|id| prescription.into_prescription(id)))
    }

    async fn find_prescription(&self, id: EntityId) -> Result<Option<Prescription>, StoreError> {
        Ok(self.tables.read().await.prescriptions.get(id))
    }

    async fn list_prescriptions(
        &self,
        record_id: EntityId,
    ) -> Result<Vec<Prescription>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .prescriptions
            .filtered(|p| p.medical_record_id == record_id))
    }

    async fn update_prescription(
        &self,
        prescription: &Prescription,
    ) -> Result<Option<Prescription>, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .prescriptions
            .replace(prescription.id, prescription))
    }

    async fn delete_prescription(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.prescriptions.remove(id))
    }

    async fn insert_lab_report(&self, report: NewLabReport) -> Result<LabReport, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .lab_reports
            .insert_with(|id| report.into_report(id)))
    }

    async fn find_lab_report(&self, id: EntityId) -> Result<Option<LabReport>, StoreError> {
        Ok(self.tables.read().await.lab_reports.get(id))
    }

    async fn list_lab_reports(&self, record_id: EntityId) -> Result<Vec<LabReport>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .lab_reports
            .filtered(|l| l.medical_record_id == record_id))
    }

    async fn update_lab_report(
        &self,
        report: &LabReport,
    ) -> Result<Option<LabReport>, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .lab_reports
            .replace(report.id, report))
    }

    async fn delete_lab_report(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.lab_reports.remove(id))
    }
}
