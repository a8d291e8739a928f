//! Invite code repository.
//!
//! Grounded on `original_source/.../server/invites.py` (`normalize_invite_code`,
//! `new_invite_code` format) and `server/models.py`'s invite table; redemption
//! is implemented as a single conditional `UPDATE` so two concurrent
//! registrations racing the same code can never both succeed.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;

#[derive(Debug, Clone, FromRow)]
pub struct InviteRow {
    pub code: String,
    pub parent_code: Option<String>,
    pub owner_principal_id: Option<String>,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<String>,
    pub disabled_at: Option<String>,
    pub created_at: String,
}

pub async fn create(
    pool: &SqlitePool,
    code: &str,
    parent_code: Option<&str>,
    owner_principal_id: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO invite_codes (code, parent_code, owner_principal_id, redeemed_by, redeemed_at, \
         disabled_at, created_at) VALUES (?, ?, ?, NULL, NULL, NULL, ?)",
    )
    .bind(code)
    .bind(parent_code)
    .bind(owner_principal_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find(pool: &SqlitePool, code: &str) -> DbResult<Option<InviteRow>> {
    let row = sqlx::query_as("SELECT * FROM invite_codes WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Redeem `code` for `principal_id`, succeeding only if the code exists,
/// is not disabled, and is not already redeemed — all three checked in the
/// `WHERE` clause of one `UPDATE`. Returns `true` iff exactly one row was
/// changed, i.e. this call won the race.
pub async fn try_redeem(pool: &SqlitePool, code: &str, principal_id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE invite_codes SET redeemed_by = ?, redeemed_at = ? \
         WHERE code = ? AND redeemed_by IS NULL AND disabled_at IS NULL",
    )
    .bind(principal_id)
    .bind(Utc::now().to_rfc3339())
    .bind(code)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Invite codes owned by `owner_principal_id` that have not yet been
/// redeemed or disabled, newest first — backs `GET /api/auth/invites`.
pub async fn list_unredeemed_for_owner(pool: &SqlitePool, owner_principal_id: &str) -> DbResult<Vec<InviteRow>> {
    let rows = sqlx::query_as(
        "SELECT * FROM invite_codes WHERE owner_principal_id = ? AND redeemed_by IS NULL \
         AND disabled_at IS NULL ORDER BY created_at DESC",
    )
    .bind(owner_principal_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn disable(pool: &SqlitePool, code: &str) -> DbResult<()> {
    sqlx::query("UPDATE invite_codes SET disabled_at = ? WHERE code = ? AND disabled_at IS NULL")
        .bind(Utc::now().to_rfc3339())
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}
