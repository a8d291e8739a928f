//! Job Engine configuration.
//!
//! Shape grounded on the teacher's `vclip-worker::config::WorkerConfig` (and
//! its `backend/` variant's `WorkerConfig::from_env()`); field set narrowed
//! to what SPEC_FULL.md §4.6/§5 actually requires — a DB-backed single poll
//! loop has no concurrency knob to tune beyond the poll interval and the
//! never-die backoff on unexpected errors.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep after finding nothing to claim.
    pub idle_poll_interval: Duration,
    /// How long to sleep between iterations when a job was just claimed
    /// (matches `original_source/.../server/worker.py::_loop`'s 0.2s
    /// skip-busy-project pause).
    pub busy_poll_interval: Duration,
    /// Sleep applied after an unexpected error so the loop never spins hot.
    pub error_backoff: Duration,
    pub projects_root: String,
    pub database_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll_interval: Duration::from_millis(500),
            busy_poll_interval: Duration::from_millis(200),
            error_backoff: Duration::from_millis(500),
            projects_root: "./output/projects".to_string(),
            database_url: "sqlite://./output/segforge.sqlite3".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            idle_poll_interval: Duration::from_millis(
                env_u64("WORKER_IDLE_POLL_MS", defaults.idle_poll_interval.as_millis() as u64),
            ),
            busy_poll_interval: Duration::from_millis(
                env_u64("WORKER_BUSY_POLL_MS", defaults.busy_poll_interval.as_millis() as u64),
            ),
            error_backoff: Duration::from_millis(
                env_u64("WORKER_ERROR_BACKOFF_MS", defaults.error_backoff.as_millis() as u64),
            ),
            projects_root: std::env::var("PROJECTS_DIR").unwrap_or(defaults.projects_root),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
