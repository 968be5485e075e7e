use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use shared_models::user::UserAccount;
use shared_models::EntityId;

use crate::supabase::SupabaseClient;

/// Identity lookups used by every cell that references users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<UserAccount>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>>;
}

/// Directory backed by the Supabase `users` table.
pub struct SupabaseDirectory {
    client: SupabaseClient,
}

impl SupabaseDirectory {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserDirectory for SupabaseDirectory {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<UserAccount>> {
        debug!("Looking up user {} in Supabase", id);
        self.client
            .select_one("users", &format!("id=eq.{}&select=*", id))
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        debug!("Looking up user by email in Supabase");
        self.client
            .select_one(
                "users",
                &format!("email=eq.{}&select=*", urlencoding::encode(email)),
            )
            .await
    }
}
