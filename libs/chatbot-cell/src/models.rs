// libs/chatbot-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::chat::{ChatMessage, ChatSession};
use shared_models::error::AppError;
use shared_models::EntityId;

// ==============================================================================
// REPLY TEXT
// ==============================================================================

pub const MEDICAL_DISCLAIMER: &str = "DISCLAIMER: This information is for educational purposes only and is not a substitute for professional medical advice. Always consult with a qualified healthcare provider for medical advice, diagnosis, or treatment.";

pub const NO_MEDICAL_INFORMATION_REPLY: &str = "I'm sorry, I couldn't find reliable information about that. Please consult with a healthcare professional for accurate advice.";

/// Upstream chat API answered without a `response` field.
pub const UNPROCESSABLE_REPLY: &str =
    "I'm sorry, I couldn't process your request at this time. Please try again later.";

/// Upstream chat API could not be reached at all.
pub const CONNECTION_FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble connecting to my knowledge base. Please try again later or contact support if the problem persists.";

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTranscript {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

/// Body sent to the external chat API.
#[derive(Debug, Serialize)]
pub struct ChatApiRequest<'a> {
    pub message: &'a str,
    pub session_id: String,
    pub context: &'static str,
    pub include_disclaimer: bool,
}

// ==============================================================================
// KNOWLEDGE CATALOGS
// ==============================================================================

/// One hit from a knowledge catalog. `summary` holds the MedlinePlus snippet
/// or the Health.gov description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub title: String,
    pub summary: String,
    pub url: String,
}

/// Results of both catalog lookups. A failed lookup is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeResults {
    pub medline_plus: Option<Vec<KnowledgeEntry>>,
    pub health_gov: Option<Vec<KnowledgeEntry>>,
}

impl KnowledgeResults {
    pub fn is_unavailable(&self) -> bool {
        self.medline_plus.is_none() && self.health_gov.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedlineResponse {
    #[serde(default)]
    pub result: Vec<MedlineHit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedlineHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthGovResponse {
    #[serde(default)]
    pub items: Vec<HealthGovItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthGovItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ChatbotError {
    #[error("Chat session not found")]
    SessionNotFound,

    #[error("Chat session {0} has ended")]
    SessionEnded(EntityId),

    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ChatbotError> for AppError {
    fn from(err: ChatbotError) -> Self {
        match err {
            ChatbotError::SessionNotFound => AppError::NotFound(err.to_string()),
            ChatbotError::SessionEnded(_) => AppError::Conflict(err.to_string()),
            ChatbotError::EmptyMessage => AppError::ValidationError(err.to_string()),
            ChatbotError::Store(store) => store.into(),
        }
    }
}
