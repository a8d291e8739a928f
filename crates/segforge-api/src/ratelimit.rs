//! Per-route rate-limit helpers wired onto `segforge_db::ratelimit::bump`.
//!
//! Window sizes grounded on SPEC_FULL.md §6's `AUTH_RL_*_PER_HOUR` env vars;
//! the counter mechanics themselves live in `segforge-db` (§4.4).

use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};

const HOUR_SECONDS: i64 = 3600;

fn limit_from_env(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Enforce a per-hour limit for `namespace:subject`, returning `RL_LIMITED`
/// once the bucket's count exceeds it.
pub async fn enforce_hourly(pool: &SqlitePool, namespace: &str, subject: &str, env_key: &str, default: i64) -> ApiResult<()> {
    let limit = limit_from_env(env_key, default);
    let count = segforge_db::ratelimit::bump(pool, namespace, subject, HOUR_SECONDS).await?;
    if count > limit {
        return Err(ApiError::RateLimited("RL_LIMITED".to_string()));
    }
    Ok(())
}
