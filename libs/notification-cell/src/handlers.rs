// libs/notification-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::AppState;

use crate::models::UnreadCount;
use crate::services::inbox::NotificationInboxService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let notifications = inbox.list(actor.id, false).await?;

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len()
    })))
}

#[axum::debug_handler]
pub async fn list_unread_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let notifications = inbox.list(actor.id, true).await?;

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len()
    })))
}

#[axum::debug_handler]
pub async fn count_unread_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<UnreadCount>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let unread = inbox.count_unread(actor.id).await?;

    Ok(Json(UnreadCount {
        user_id: actor.id,
        unread,
    }))
}

#[axum::debug_handler]
pub async fn get_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let notification = inbox.get(actor.id, notification_id).await?;

    Ok(Json(json!(notification)))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let notification = inbox.mark_read(actor.id, notification_id).await?;

    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}

#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let inbox = NotificationInboxService::new(state.repository.clone());
    let updated = inbox.mark_all_read(actor.id).await?;

    Ok(Json(json!({
        "success": true,
        "updated": updated
    })))
}
