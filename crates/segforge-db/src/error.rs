//! Error types for Data Store operations.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("malformed row: {0}")]
    Decode(String),
}

impl From<uuid::Error> for DbError {
    fn from(e: uuid::Error) -> Self {
        DbError::Decode(e.to_string())
    }
}

impl From<chrono::ParseError> for DbError {
    fn from(e: chrono::ParseError) -> Self {
        DbError::Decode(e.to_string())
    }
}
