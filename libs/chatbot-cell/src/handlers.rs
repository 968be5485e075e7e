use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::extractor::ValidatedJson;

use crate::models::SendMessageRequest;
use crate::router::ChatbotState;

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<ChatbotState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions().create_session(&actor).await?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn list_sessions(
    State(state): State<ChatbotState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let sessions = state.sessions().list_sessions(&actor).await?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<ChatbotState>,
    Path(session_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let transcript = state.sessions().get_session(session_id, &actor).await?;

    Ok(Json(json!(transcript)))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<ChatbotState>,
    Path(session_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} posting to chat session {}", actor.id, session_id);

    let reply = state
        .sessions()
        .post_message(session_id, &request.content, &actor)
        .await?;

    Ok(Json(json!(reply)))
}

#[axum::debug_handler]
pub async fn chat_history(
    State(state): State<ChatbotState>,
    Path(session_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let messages = state.sessions().history(session_id, &actor).await?;

    Ok(Json(json!({
        "messages": messages,
        "total": messages.len()
    })))
}

#[axum::debug_handler]
pub async fn end_session(
    State(state): State<ChatbotState>,
    Path(session_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions().end_session(session_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Chat session ended successfully",
        "session": session
    })))
}

#[axum::debug_handler]
pub async fn chatbot_config(State(state): State<ChatbotState>) -> Json<Value> {
    Json(json!({
        "disclaimers": state.assistant.disclaimers(),
        "medical_sources": state.assistant.medical_sources()
    }))
}
