use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use shared_database::ClinicRepository;
use shared_models::auth::Actor;
use shared_models::chat::{ChatMessage, ChatSession, NewChatMessage, Sender};
use shared_models::EntityId;

use crate::models::{ChatReply, ChatbotError, SessionTranscript};
use crate::services::assistant::ChatAssistant;

pub struct ChatSessionService {
    repository: Arc<dyn ClinicRepository>,
    assistant: Arc<ChatAssistant>,
}

impl ChatSessionService {
    pub fn new(repository: Arc<dyn ClinicRepository>, assistant: Arc<ChatAssistant>) -> Self {
        Self {
            repository,
            assistant,
        }
    }

    pub async fn create_session(&self, actor: &Actor) -> Result<ChatSession, ChatbotError> {
        let session = self.repository.insert_chat_session(actor.id).await?;

        info!("Chat session {} started for user {}", session.id, actor.id);
        Ok(session)
    }

    /// Newest first.
    pub async fn list_sessions(&self, actor: &Actor) -> Result<Vec<ChatSession>, ChatbotError> {
        Ok(self.repository.list_chat_sessions(actor.id).await?)
    }

    pub async fn get_session(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<SessionTranscript, ChatbotError> {
        let session = self.visible_session(session_id, actor).await?;
        let messages = self.repository.list_chat_messages(session_id).await?;
        Ok(SessionTranscript { session, messages })
    }

    pub async fn history(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<Vec<ChatMessage>, ChatbotError> {
        self.visible_session(session_id, actor).await?;
        Ok(self.repository.list_chat_messages(session_id).await?)
    }

    /// Stores the user's message, asks the assistant, then stores the reply.
    /// Nothing is held open while the assistant is working, so the session is
    /// checked again before the reply lands.
    pub async fn post_message(
        &self,
        session_id: EntityId,
        content: &str,
        actor: &Actor,
    ) -> Result<ChatReply, ChatbotError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatbotError::EmptyMessage);
        }

        self.writable_session(session_id, actor).await?;
        self.repository
            .insert_chat_message(NewChatMessage::text(session_id, content.to_string(), Sender::User))
            .await?;

        let response = self.assistant.reply(content, session_id).await;

        let mut session = self.writable_session(session_id, actor).await?;
        let message = self
            .repository
            .insert_chat_message(NewChatMessage::text(session_id, response, Sender::Bot))
            .await?;

        session.last_activity_time = Some(message.timestamp);
        self.repository.update_chat_session(&session).await?;

        Ok(ChatReply {
            response: message.content,
            timestamp: message.timestamp,
        })
    }

    pub async fn end_session(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<ChatSession, ChatbotError> {
        let mut session = self.owned_session(session_id, actor).await?;
        if session.is_active {
            session.is_active = false;
            session.end_time = Some(Utc::now());
            session = self
                .repository
                .update_chat_session(&session)
                .await?
                .ok_or(ChatbotError::SessionNotFound)?;
        }

        info!("Chat session {} ended", session_id);
        Ok(session)
    }

    /// Owners see their sessions; admins may read any. Everyone else gets not found.
    async fn visible_session(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<ChatSession, ChatbotError> {
        self.repository
            .find_chat_session(session_id)
            .await?
            .filter(|s| s.user_id == actor.id || actor.is_admin())
            .ok_or(ChatbotError::SessionNotFound)
    }

    async fn owned_session(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<ChatSession, ChatbotError> {
        self.repository
            .find_chat_session(session_id)
            .await?
            .filter(|s| s.user_id == actor.id)
            .ok_or(ChatbotError::SessionNotFound)
    }

    async fn writable_session(
        &self,
        session_id: EntityId,
        actor: &Actor,
    ) -> Result<ChatSession, ChatbotError> {
        let session = self.owned_session(session_id, actor).await?;
        if !session.is_active {
            return Err(ChatbotError::SessionEnded(session_id));
        }
        Ok(session)
    }
}
