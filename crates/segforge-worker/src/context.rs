//! Shared dependencies threaded through every job handler.

use std::path::PathBuf;
use std::sync::Arc;

use segforge_llm::LlmClient;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub projects_root: PathBuf,
    pub llm: Arc<dyn LlmClient>,
}

impl JobContext {
    pub fn new(pool: SqlitePool, projects_root: impl Into<PathBuf>, llm: Arc<dyn LlmClient>) -> Self {
        Self { pool, projects_root: projects_root.into(), llm }
    }
}
