use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;
use crate::services::assistant::ChatAssistant;
use crate::services::session::ChatSessionService;

#[derive(Clone)]
pub struct ChatbotState {
    pub app: AppState,
    pub assistant: Arc<ChatAssistant>,
}

impl ChatbotState {
    pub fn sessions(&self) -> ChatSessionService {
        ChatSessionService::new(self.app.repository.clone(), self.assistant.clone())
    }
}

pub fn chatbot_routes(app: AppState, assistant: Arc<ChatAssistant>) -> Router {
    let state = ChatbotState { app, assistant };

    let protected_routes = Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/{session_id}", get(handlers::get_session))
        .route(
            "/sessions/{session_id}/messages",
            get(handlers::chat_history).post(handlers::send_message),
        )
        .route("/sessions/{session_id}/end", post(handlers::end_session))
        .route("/config", get(handlers::chatbot_config))
        .layer(middleware::from_fn_with_state(
            state.app.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
