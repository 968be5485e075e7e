use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: EntityId,
    pub user_id: EntityId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_activity_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Append-only. Ordering within a session follows `timestamp`, ties broken by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: EntityId,
    pub session_id: EntityId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewChatMessage {
    pub session_id: EntityId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub message_type: Option<String>,
}

impl NewChatMessage {
    pub fn text(session_id: EntityId, content: String, sender: Sender) -> Self {
        Self {
            session_id,
            content,
            sender,
            timestamp: Utc::now(),
            message_type: Some("TEXT".to_string()),
        }
    }

    pub fn into_message(self, id: EntityId) -> ChatMessage {
        ChatMessage {
            id,
            session_id: self.session_id,
            content: self.content,
            sender: self.sender,
            timestamp: self.timestamp,
            message_type: self.message_type,
        }
    }
}
