use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: EntityId,
    pub user_id: EntityId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub related_appointment_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    AppointmentRequested,
    AppointmentConfirmed,
    AppointmentRejected,
    AppointmentCancelled,
    AppointmentReminder,
    System,
}

/// Everything needed to persist a notification except the generated fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationDraft {
    pub user_id: EntityId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub related_appointment_id: Option<EntityId>,
}

impl NotificationDraft {
    pub fn new(
        user_id: EntityId,
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            notification_type,
            related_appointment_id: None,
        }
    }

    pub fn for_appointment(mut self, appointment_id: EntityId) -> Self {
        self.related_appointment_id = Some(appointment_id);
        self
    }

    pub fn into_notification(self, id: EntityId, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            notification_type: self.notification_type,
            is_read: false,
            related_appointment_id: self.related_appointment_id,
            created_at,
        }
    }
}
