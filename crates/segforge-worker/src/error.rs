//! Job Engine error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("database error: {0}")]
    Db(#[from] segforge_db::DbError),

    #[error("storage error: {0}")]
    Storage(#[from] segforge_storage::StorageError),

    #[error("media error: {0}")]
    Media(#[from] segforge_media::MediaError),

    #[error("llm error: {0}")]
    Llm(#[from] segforge_llm::LlmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
