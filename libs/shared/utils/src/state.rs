use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{ClinicRepository, MemoryRepository, UserDirectory};

/// Shared handles passed to every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Arc<dyn ClinicRepository>,
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        repository: Arc<dyn ClinicRepository>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            repository,
            directory,
        }
    }

    /// State served entirely from one in-process repository.
    pub fn in_memory(config: Arc<AppConfig>, repository: Arc<MemoryRepository>) -> Self {
        Self::new(config, repository.clone(), repository)
    }
}
