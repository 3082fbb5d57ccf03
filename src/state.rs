use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::tasks::{TaskBackend, TaskServiceClient};

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Side-channel task service shared by all calls
    pub task_backend: Arc<dyn TaskBackend>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let client = TaskServiceClient::new(config.task_service_config());
        if !client.is_configured() {
            tracing::warn!(
                "BACKGROUND_AGENT_API_URL not set, spoken task commands will fail with an apology"
            );
        }
        Self::with_task_backend(config, Arc::new(client))
    }

    /// State with a caller-supplied task backend.
    pub fn with_task_backend(config: ServerConfig, task_backend: Arc<dyn TaskBackend>) -> Arc<Self> {
        Arc::new(Self {
            config,
            task_backend,
        })
    }
}
