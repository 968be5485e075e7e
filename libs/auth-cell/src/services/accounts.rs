use std::sync::Arc;

use tracing::debug;

use shared_database::UserDirectory;
use shared_models::auth::{Actor, Role};
use shared_models::user::UserAccount;
use shared_models::EntityId;

use crate::models::AuthError;

/// Read access to directory accounts for authenticated callers.
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
}

impl AccountService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// The caller's own account. A valid token whose subject is missing from
    /// the directory yields `None`.
    pub async fn own_account(&self, actor: &Actor) -> Result<Option<UserAccount>, AuthError> {
        self.lookup(actor.id).await
    }

    /// Admins and doctors may view any account; patients only themselves
    /// and doctors.
    pub async fn get_user(&self, id: EntityId, actor: &Actor) -> Result<UserAccount, AuthError> {
        let account = self.lookup(id).await?.ok_or(AuthError::UserNotFound(id))?;

        if actor.is_patient() && account.id != actor.id && !account.has_role(Role::Doctor) {
            return Err(AuthError::Forbidden);
        }

        Ok(account)
    }

    async fn lookup(&self, id: EntityId) -> Result<Option<UserAccount>, AuthError> {
        debug!("Resolving account {}", id);
        self.directory
            .find_by_id(id)
            .await
            .map_err(|e| AuthError::Directory(e.to_string()))
    }
}
