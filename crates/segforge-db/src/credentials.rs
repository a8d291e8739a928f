//! Username/password credential repository.
//!
//! Grounded on `original_source/.../server/models.py` (the `passwords` table
//! backing the Password+Invite auth variant) and `server/passwords.py`'s
//! stored-hash format (hashing itself lives in `segforge-api::passwords`).

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, FromRow)]
pub struct CredentialRow {
    pub principal_id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

pub async fn create(
    pool: &SqlitePool,
    principal_id: &str,
    username: &str,
    password_hash: &str,
) -> DbResult<()> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT principal_id FROM passwords WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(DbError::Conflict(format!("username {username} already registered")));
    }

    sqlx::query(
        "INSERT INTO passwords (principal_id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(principal_id)
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> DbResult<Option<CredentialRow>> {
    let row = sqlx::query_as("SELECT * FROM passwords WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
