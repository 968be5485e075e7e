use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::EntityId;

use crate::models::{ChatApiRequest, UNPROCESSABLE_REPLY};

/// General-purpose conversation backend for non-medical questions.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(&self, message: &str, session_id: EntityId) -> Result<String>;
}

pub struct HttpChatResponder {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpChatResponder {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.chatbot_timeout())
            .build()
            .context("failed to build chat API client")?;

        Ok(Self {
            client,
            api_url: config.chatbot_api_url.clone(),
            api_key: config.chatbot_api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatResponder for HttpChatResponder {
    async fn respond(&self, message: &str, session_id: EntityId) -> Result<String> {
        if self.api_url.is_empty() {
            return Err(anyhow!("Chat API not configured"));
        }

        let body = ChatApiRequest {
            message,
            session_id: session_id.to_string(),
            context: "medical",
            include_disclaimer: true,
        };

        debug!("Forwarding chat message for session {}", session_id);

        let response = self
            .client
            .post(&self.api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat API error ({}): {}", status, error_text);
            return Err(anyhow!("Chat API error: {}", status));
        }

        let reply: Value = response.json().await?;
        Ok(reply["response"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| UNPROCESSABLE_REPLY.to_string()))
    }
}
