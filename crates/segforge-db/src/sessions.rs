//! Auth session repository.
//!
//! Grounded on `original_source/.../server/models.py::AuthSession` and
//! `server/auth.py::get_current_user` (hash lookup, expiry check,
//! best-effort `last_seen_at` touch).

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub principal_id: String,
    pub token_hash: String,
    pub created_at: String,
    pub expires_at: String,
    pub revoked_at: Option<String>,
    pub last_seen_at: String,
}

pub async fn create(
    pool: &SqlitePool,
    principal_id: &str,
    token_hash: &str,
    ttl: Duration,
) -> DbResult<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let expires_at = now + ttl;
    sqlx::query(
        "INSERT INTO auth_sessions (id, principal_id, token_hash, created_at, expires_at, \
         revoked_at, last_seen_at) VALUES (?, ?, ?, ?, ?, NULL, ?)",
    )
    .bind(&id)
    .bind(principal_id)
    .bind(token_hash)
    .bind(now.to_rfc3339())
    .bind(expires_at.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

/// Look up a live (unrevoked, unexpired) session by its token hash. Returns
/// `None` rather than an error on miss/expiry — the caller maps that to
/// `AUTH_REQUIRED`, never leaking *why* the session was rejected.
pub async fn find_live_by_token_hash(pool: &SqlitePool, token_hash: &str) -> DbResult<Option<SessionRow>> {
    let row: Option<SessionRow> = sqlx::query_as(
        "SELECT * FROM auth_sessions WHERE token_hash = ? AND revoked_at IS NULL LIMIT 1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let expires_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&row.expires_at)?.with_timezone(&Utc);
    if expires_at <= Utc::now() {
        return Ok(None);
    }
    Ok(Some(row))
}

/// Best-effort presence touch; failures here must never fail the request
/// that triggered them (matches the original's swallow-and-log behavior).
pub async fn touch_last_seen(pool: &SqlitePool, id: &str) {
    let _ = sqlx::query("UPDATE auth_sessions SET last_seen_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await;
}

pub async fn revoke(pool: &SqlitePool, token_hash: &str) -> DbResult<()> {
    sqlx::query("UPDATE auth_sessions SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL")
        .bind(Utc::now().to_rfc3339())
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}
