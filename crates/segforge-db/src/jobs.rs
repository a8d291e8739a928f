//! Job repository: the FIFO job table the worker's poll loop consumes.
//!
//! Grounded on `original_source/.../server/models.py::Job`, the `create_job`/
//! `list_jobs`/`get_job` handlers in `server/routes/jobs.py`, and the
//! queued-job selection + merge-not-replace result update in
//! `server/worker.py` (`_loop`, `_set_job`).

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use segforge_models::{
    ids::{JobId, ProjectId},
    job::{Job, JobStatus, JobType},
};

use crate::error::{DbError, DbResult};
use crate::row::JobRow;

pub async fn insert(
    pool: &SqlitePool,
    project_id: ProjectId,
    job_type: JobType,
    payload: &Value,
) -> DbResult<Job> {
    let id = JobId::new();
    let now = Utc::now().to_rfc3339();
    let result = segforge_models::job::ui_message("jobmsg.queued", None);
    sqlx::query(
        "INSERT INTO jobs (id, project_id, job_type, status, progress, message, error, payload, \
         result, created_at, updated_at) VALUES (?, ?, ?, 'queued', 0, 'queued', NULL, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(project_id.as_str())
    .bind(job_type.to_string())
    .bind(payload.to_string())
    .bind(result.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get(pool: &SqlitePool, id: JobId) -> DbResult<Option<Job>> {
    let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(JobRow::into_model).transpose()?)
}

pub async fn list_for_project(pool: &SqlitePool, project_id: ProjectId, limit: i64) -> DbResult<Vec<Job>> {
    let limit = limit.clamp(1, 200);
    let rows: Vec<JobRow> = sqlx::query_as(
        "SELECT * FROM jobs WHERE project_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(project_id.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(JobRow::into_model).collect::<Result<_, _>>().map_err(Into::into)
}

/// Atomically claim the oldest queued job whose project has no job already
/// `running`, marking it `running` in the same statement so two poll loops
/// (or two passes of a restarted single loop) can never double-claim it.
///
/// Grounded on `worker.py::_loop`'s dequeue-oldest / skip-if-project-busy
/// rule, reimplemented as a single conditional `UPDATE ... RETURNING` instead
/// of the original's separate select-then-compare-in-Python steps so the
/// check-then-set has no race window under sqlite's single-writer model.
pub async fn claim_next(pool: &SqlitePool) -> DbResult<Option<Job>> {
    let row: Option<JobRow> = sqlx::query_as(
        "UPDATE jobs SET status = 'running', progress = 1, updated_at = ? \
         WHERE id = ( \
             SELECT id FROM jobs \
             WHERE status = 'queued' \
             AND project_id NOT IN (SELECT project_id FROM jobs WHERE status = 'running') \
             ORDER BY created_at ASC LIMIT 1 \
         ) \
         RETURNING *",
    )
    .bind(Utc::now().to_rfc3339())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(JobRow::into_model).transpose()?)
}

pub async fn set_progress(pool: &SqlitePool, id: JobId, progress: i32, message: &str) -> DbResult<()> {
    sqlx::query("UPDATE jobs SET progress = ?, message = ?, updated_at = ? WHERE id = ?")
        .bind(progress)
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Merge `patch` into the job's stored `result` JSON object rather than
/// replacing it, matching `_set_job`'s `cur.update(result)` semantics — a
/// handler's `ui_message` write must not clobber a sibling key another step
/// already set (e.g. `video_url` set early, `ui_message` set later).
pub async fn merge_result(pool: &SqlitePool, id: JobId, patch: &Value) -> DbResult<()> {
    let current = sqlx::query_as::<_, (String,)>("SELECT result FROM jobs WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    let Some((raw,)) = current else {
        return Err(DbError::NotFound);
    };
    let mut merged: Value =
        serde_json::from_str(&raw).unwrap_or_else(|_| Value::Object(Default::default()));
    if let (Some(dst), Some(src)) = (merged.as_object_mut(), patch.as_object()) {
        for (k, v) in src {
            dst.insert(k.clone(), v.clone());
        }
    }
    sqlx::query("UPDATE jobs SET result = ?, updated_at = ? WHERE id = ?")
        .bind(merged.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Transition a job to a terminal status. On success, progress jumps to 100;
/// on failure, `message` is set to `"failed"` and `progress` is left as the
/// handler last reported it (SPEC_FULL.md §4.6: "exception → status=failed,
/// message=\"failed\", error=<str(e)> (progress unchanged)").
pub async fn finish(pool: &SqlitePool, id: JobId, status: JobStatus, error: Option<&str>) -> DbResult<()> {
    if status == JobStatus::Succeeded {
        sqlx::query("UPDATE jobs SET status = ?, error = NULL, progress = 100, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(id.as_str())
            .execute(pool)
            .await?;
    } else {
        sqlx::query("UPDATE jobs SET status = ?, error = ?, message = 'failed', updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(error)
            .bind(Utc::now().to_rfc3339())
            .bind(id.as_str())
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn has_running_for_project(pool: &SqlitePool, project_id: ProjectId) -> DbResult<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM jobs WHERE project_id = ? AND status = 'running' LIMIT 1")
            .bind(project_id.as_str())
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}
