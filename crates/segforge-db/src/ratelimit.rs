//! DB-backed windowed rate-limit counters.
//!
//! Grounded on `original_source/.../server/ratelimit.py`: a counter keyed by
//! `namespace:subject:bucket` where `bucket` is the window-aligned epoch
//! second, insert-or-reset-or-increment with a retry on the rare race
//! between two requests hitting the same fresh bucket, and a throttled
//! sweeper that only runs the expired-row cleanup at most once per
//! `SWEEP_MIN_INTERVAL`.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;

const SWEEP_MIN_INTERVAL_SECONDS: i64 = 600;

static LAST_SWEEP_EPOCH: AtomicI64 = AtomicI64::new(0);

pub fn make_window_key(namespace: &str, subject: &str, now_epoch_seconds: i64, window_seconds: i64) -> String {
    let bucket = now_epoch_seconds - (now_epoch_seconds % window_seconds);
    format!("{namespace}:{subject}:{bucket}")
}

fn now_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Increment the counter for the current window, creating or resetting it as
/// needed, and return the post-increment count. Retries once on the rare
/// race where two requests both try to create the same fresh bucket row.
pub async fn bump(pool: &SqlitePool, namespace: &str, subject: &str, window_seconds: i64) -> DbResult<i64> {
    maybe_sweep(pool).await;

    let now = now_epoch_seconds();
    let key = make_window_key(namespace, subject, now, window_seconds);
    let expires_at = Utc::now() + chrono::Duration::seconds(window_seconds);

    for _ in 0..2 {
        let inserted = sqlx::query(
            "INSERT INTO rate_limit_counters (key, count, expires_at) VALUES (?, 1, ?) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(&key)
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(1);
        }

        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT count, expires_at FROM rate_limit_counters WHERE key = ?")
                .bind(&key)
                .fetch_optional(pool)
                .await?;

        let Some((count, row_expires_at)) = row else {
            continue;
        };

        let expired = chrono::DateTime::parse_from_rfc3339(&row_expires_at)
            .map(|d| d.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);

        if expired {
            let updated = sqlx::query(
                "UPDATE rate_limit_counters SET count = 1, expires_at = ? WHERE key = ? AND expires_at = ?",
            )
            .bind(expires_at.to_rfc3339())
            .bind(&key)
            .bind(&row_expires_at)
            .execute(pool)
            .await?;
            if updated.rows_affected() == 1 {
                return Ok(1);
            }
            continue;
        }

        let next = count + 1;
        let updated = sqlx::query("UPDATE rate_limit_counters SET count = ? WHERE key = ? AND count = ?")
            .bind(next)
            .bind(&key)
            .bind(count)
            .execute(pool)
            .await?;
        if updated.rows_affected() == 1 {
            return Ok(next);
        }
    }

    // A third, unlikely race: fall back to a plain read so callers never
    // hard-fail a rate-limit check over contention.
    let row: Option<(i64,)> = sqlx::query_as("SELECT count FROM rate_limit_counters WHERE key = ?")
        .bind(&key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(c,)| c).unwrap_or(1))
}

/// Sweep expired counter rows, throttled to at most once per
/// `SWEEP_MIN_INTERVAL_SECONDS` across the process.
async fn maybe_sweep(pool: &SqlitePool) {
    let now = now_epoch_seconds();
    let last = LAST_SWEEP_EPOCH.load(Ordering::Relaxed);
    if now - last < SWEEP_MIN_INTERVAL_SECONDS {
        return;
    }
    if LAST_SWEEP_EPOCH
        .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = sqlx::query("DELETE FROM rate_limit_counters WHERE expires_at <= ?")
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_key_aligns_to_bucket() {
        assert_eq!(make_window_key("otp", "a@b.com", 125, 60), "otp:a@b.com:120");
        assert_eq!(make_window_key("otp", "a@b.com", 180, 60), "otp:a@b.com:180");
    }
}
