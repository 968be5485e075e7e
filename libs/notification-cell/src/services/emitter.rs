// libs/notification-cell/src/services/emitter.rs
use tracing::{debug, warn};

use shared_database::ClinicRepository;
use shared_models::notification::Notification;

use crate::models::{NotificationDraft, NotificationError};

/// Checks drafts before they reach the repository and writes standalone ones.
pub struct NotificationEmitter;

impl NotificationEmitter {
    pub fn validate(draft: &NotificationDraft) -> Result<(), NotificationError> {
        if draft.title.trim().is_empty() {
            return Err(NotificationError::BlankField("title"));
        }
        if draft.message.trim().is_empty() {
            return Err(NotificationError::BlankField("message"));
        }
        Ok(())
    }

    /// A draft that fails validation is logged and dropped, so the write it
    /// accompanies still goes ahead without it.
    pub fn best_effort(draft: NotificationDraft) -> Option<NotificationDraft> {
        match Self::validate(&draft) {
            Ok(()) => Some(draft),
            Err(e) => {
                warn!("Dropping notification for user {}: {}", draft.user_id, e);
                None
            }
        }
    }

    pub async fn emit(
        repository: &dyn ClinicRepository,
        draft: NotificationDraft,
    ) -> Result<Notification, NotificationError> {
        Self::validate(&draft)?;
        let notification = repository.insert_notification(draft).await?;

        debug!(
            "Emitted {:?} notification {} for user {}",
            notification.notification_type, notification.id, notification.user_id
        );
        Ok(notification)
    }
}
