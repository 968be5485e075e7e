// libs/notification-cell/src/services/inbox.rs
use std::sync::Arc;

use tracing::{debug, info};

use shared_database::ClinicRepository;
use shared_models::notification::Notification;
use shared_models::EntityId;

use crate::models::NotificationError;

/// Read and mark-read operations, always scoped to the owning user.
pub struct NotificationInboxService {
    repository: Arc<dyn ClinicRepository>,
}

impl NotificationInboxService {
    pub fn new(repository: Arc<dyn ClinicRepository>) -> Self {
        Self { repository }
    }

    /// Newest first.
    pub async fn list(
        &self,
        user_id: EntityId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, NotificationError> {
        debug!("Listing notifications for user {} (unread_only={})", user_id, unread_only);
        Ok(self.repository.list_notifications(user_id, unread_only).await?)
    }

    pub async fn count_unread(&self, user_id: EntityId) -> Result<usize, NotificationError> {
        Ok(self.list(user_id, true).await?.len())
    }

    /// Another user's notification is reported as missing.
    pub async fn get(
        &self,
        user_id: EntityId,
        notification_id: EntityId,
    ) -> Result<Notification, NotificationError> {
        self.repository
            .find_notification(notification_id)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or(NotificationError::NotFound)
    }

    pub async fn mark_read(
        &self,
        user_id: EntityId,
        notification_id: EntityId,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .repository
            .mark_notification_read(user_id, notification_id)
            .await?
            .ok_or(NotificationError::NotFound)?;

        debug!("Notification {} marked read by user {}", notification_id, user_id);
        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: EntityId) -> Result<usize, NotificationError> {
        let updated = self.repository.mark_all_notifications_read(user_id).await?;

        info!("Marked {} notifications read for user {}", updated, user_id);
        Ok(updated)
    }
}
