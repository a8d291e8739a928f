//! Sqlite pool construction and migration runner.
//!
//! Grounded on `original_source/.../server/db.py::get_engine` (cached engine
//! construction, `sqlite:///...` URL handling), generalized from SQLAlchemy's
//! engine cache to a `sqlx::SqlitePool` built once at startup and threaded
//! through `AppState`.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Connect to the sqlite database at `database_url`, creating the file and
/// its parent directory if missing, and run pending migrations.
///
/// `database_url` follows sqlx's `sqlite://<path>` convention; a bare
/// filesystem path is also accepted for convenience (mirrors the original's
/// tolerant `sqlite:///output/autosedance.sqlite3` default).
pub async fn connect(database_url: &str) -> DbResult<SqlitePool> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(pool)
}

/// A pool over `:memory:`, used by integration tests; each call opens a
/// fresh, independent database with migrations applied.
#[cfg(any(test, feature = "test-util"))]
pub async fn connect_in_memory() -> DbResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    Ok(pool)
}
