//! Application state.

use std::sync::Arc;

use sqlx::SqlitePool;

use segforge_llm::{HttpLlmClient, LlmClient, LlmClientConfig};
use segforge_storage::ProjectLayout;

use crate::config::ApiConfig;

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pool: SqlitePool,
    pub llm: Arc<dyn LlmClient>,
    pub overload: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = segforge_db::connect(&config.database_url).await?;
        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(LlmClientConfig::from_env())?);
        let overload = Arc::new(tokio::sync::Semaphore::new(config.overload_max_inflight_requests));
        Ok(Self { config, pool, llm, overload })
    }

    pub fn layout(&self, project_id: segforge_models::ProjectId) -> ProjectLayout {
        ProjectLayout::new(&self.config.projects_root, project_id)
    }
}
