//! Email OTP repository.
//!
//! Grounded on `original_source/.../server/models.py::EmailOtp` and the
//! `request_code`/`verify_code` handlers in `server/routes/auth.py`: newest
//! unexpired, unconsumed code wins; attempts increment on every failed
//! check and the row is consumed once the attempt cap is hit.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;

pub const MAX_ATTEMPTS: i64 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct OtpRow {
    pub id: String,
    pub email: String,
    pub code_hash: String,
    pub attempts: i64,
    pub created_at: String,
    pub expires_at: String,
    pub consumed_at: Option<String>,
}

pub async fn create(pool: &SqlitePool, email: &str, code_hash: &str, ttl: Duration) -> DbResult<()> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO email_otps (id, email, code_hash, attempts, created_at, expires_at, consumed_at) \
         VALUES (?, ?, ?, 0, ?, ?, NULL)",
    )
    .bind(&id)
    .bind(email)
    .bind(code_hash)
    .bind(now.to_rfc3339())
    .bind((now + ttl).to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently sent OTP for `email` that is neither consumed nor expired —
/// used both to enforce a minimum resend interval and as the candidate row
/// `verify_code` compares against.
pub async fn most_recent_active(pool: &SqlitePool, email: &str) -> DbResult<Option<OtpRow>> {
    let row: Option<OtpRow> = sqlx::query_as(
        "SELECT * FROM email_otps WHERE email = ? AND consumed_at IS NULL \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let expires_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&row.expires_at)?.with_timezone(&Utc);
    if expires_at <= Utc::now() {
        return Ok(None);
    }
    Ok(Some(row))
}

/// All unexpired, unconsumed candidates for `email`, newest first — the set
/// `verify_code` scans a submitted code against (more than one may be live
/// if the user requested several codes in a row).
pub async fn active_candidates(pool: &SqlitePool, email: &str) -> DbResult<Vec<OtpRow>> {
    let rows: Vec<OtpRow> = sqlx::query_as(
        "SELECT * FROM email_otps WHERE email = ? AND consumed_at IS NULL ORDER BY created_at DESC",
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    Ok(rows
        .into_iter()
        .filter(|r| {
            DateTime::parse_from_rfc3339(&r.expires_at)
                .map(|d| d.with_timezone(&Utc) > now)
                .unwrap_or(false)
        })
        .collect())
}

pub async fn increment_attempts(pool: &SqlitePool, id: &str) -> DbResult<i64> {
    sqlx::query("UPDATE email_otps SET attempts = attempts + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    let row: (i64,) = sqlx::query_as("SELECT attempts FROM email_otps WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn consume(pool: &SqlitePool, id: &str) -> DbResult<()> {
    sqlx::query("UPDATE email_otps SET consumed_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
