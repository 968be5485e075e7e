// libs/notification-cell/src/models.rs
use serde::Serialize;
use thiserror::Error;

use shared_models::error::AppError;
use shared_models::EntityId;
use shared_database::StoreError;

pub use shared_models::notification::NotificationDraft;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub user_id: EntityId,
    pub unread: usize,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Notification {0} must not be blank")]
    BlankField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => AppError::NotFound(err.to_string()),
            NotificationError::BlankField(_) => AppError::ValidationError(err.to_string()),
            NotificationError::Store(store) => store.into(),
        }
    }
}
