//! Segment repository.
//!
//! Grounded on `original_source/.../server/models.py::Segment` and the
//! `generate_segment`/`update_segment`/`upload_segment_video`/`analyze_segment`
//! handlers in `server/routes/segments.py`.

use chrono::Utc;
use sqlx::SqlitePool;

use segforge_models::{Segment, SegmentStatus, ProjectId};

use crate::error::DbResult;
use crate::row::SegmentRow;

pub async fn get(pool: &SqlitePool, project_id: ProjectId, index: i64) -> DbResult<Option<Segment>> {
    let row: Option<SegmentRow> =
        sqlx::query_as("SELECT * FROM segments WHERE project_id = ? AND idx = ?")
            .bind(project_id.as_str())
            .bind(index)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(SegmentRow::into_model).transpose()?)
}

pub async fn list_for_project(pool: &SqlitePool, project_id: ProjectId) -> DbResult<Vec<Segment>> {
    let rows: Vec<SegmentRow> =
        sqlx::query_as("SELECT * FROM segments WHERE project_id = ? ORDER BY idx ASC")
            .bind(project_id.as_str())
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(SegmentRow::into_model).collect::<Result<_, _>>().map_err(Into::into)
}

/// Insert-or-update the script/prompt for a segment, setting `status =
/// script_ready`. Used by `segment_generate`; the row may not exist yet
/// (segments are created lazily on first write, matching
/// `original_source/.../server/routes/segments.py::generate_segment`).
pub async fn upsert_script(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    segment_script: &str,
    video_prompt: &str,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO segments (project_id, idx, segment_script, video_prompt, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'script_ready', ?, ?) \
         ON CONFLICT (project_id, idx) DO UPDATE SET \
         segment_script = excluded.segment_script, video_prompt = excluded.video_prompt, \
         status = 'script_ready', video_path = NULL, video_description = NULL, last_frame_path = NULL, \
         updated_at = excluded.updated_at",
    )
    .bind(project_id.as_str())
    .bind(index)
    .bind(segment_script)
    .bind(video_prompt)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Apply a manual script/prompt edit. Media (`video_path`/`video_description`/
/// `last_frame_path`) is cleared only when the caller actually supplied a
/// `segment_script` or `video_prompt`, matching `update_segment`'s `if
/// payload.segment_script is not None or payload.video_prompt is not None`
/// gate — a request with neither field set must not touch the segment's
/// existing video/analysis. The `invalidate_downstream` flag (handled by the
/// caller) only governs sibling segments, independent of this gate.
pub async fn update_edit(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    segment_script: Option<&str>,
    video_prompt: Option<&str>,
) -> DbResult<()> {
    if segment_script.is_none() && video_prompt.is_none() {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();
    let existing = get(pool, project_id, index).await?;
    let (script, prompt) = match existing {
        Some(seg) => (
            segment_script.unwrap_or(&seg.segment_script).to_string(),
            video_prompt.unwrap_or(&seg.video_prompt).to_string(),
        ),
        None => (
            segment_script.unwrap_or("").to_string(),
            video_prompt.unwrap_or("").to_string(),
        ),
    };
    sqlx::query(
        "INSERT INTO segments (project_id, idx, segment_script, video_prompt, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'script_ready', ?, ?) \
         ON CONFLICT (project_id, idx) DO UPDATE SET \
         segment_script = excluded.segment_script, video_prompt = excluded.video_prompt, \
         status = 'script_ready', video_path = NULL, video_description = NULL, last_frame_path = NULL, \
         updated_at = excluded.updated_at",
    )
    .bind(project_id.as_str())
    .bind(index)
    .bind(script)
    .bind(prompt)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Demote every segment at or after `from_index` to `pending` and clear
/// their media — the downstream half of a cascading invalidation.
pub async fn invalidate_downstream(pool: &SqlitePool, project_id: ProjectId, from_index: i64) -> DbResult<()> {
    sqlx::query(
        "UPDATE segments SET status = 'pending', video_path = NULL, video_description = NULL, \
         last_frame_path = NULL, updated_at = ? WHERE project_id = ? AND idx >= ?",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(project_id.as_str())
    .bind(from_index)
    .execute(pool)
    .await?;
    Ok(())
}

/// Demote every segment in the project to `pending` (full-script regeneration).
pub async fn invalidate_all(pool: &SqlitePool, project_id: ProjectId) -> DbResult<()> {
    sqlx::query(
        "UPDATE segments SET status = 'pending', video_path = NULL, video_description = NULL, \
         last_frame_path = NULL, updated_at = ? WHERE project_id = ?",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(project_id.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    status: SegmentStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE segments SET status = ?, updated_at = ? WHERE project_id = ? AND idx = ?")
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(project_id.as_str())
        .bind(index)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record an uploaded video and its freshly extracted last frame (frame path
/// may be absent if extraction failed — `upload_segment_video` still succeeds
/// with a warning in that case).
pub async fn set_video(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    video_path: &str,
    last_frame_path: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE segments SET video_path = ?, last_frame_path = ?, video_description = NULL, \
         status = 'waiting_video', updated_at = ? WHERE project_id = ? AND idx = ?",
    )
    .bind(video_path)
    .bind(last_frame_path)
    .bind(Utc::now().to_rfc3339())
    .bind(project_id.as_str())
    .bind(index)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_last_frame_path(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    last_frame_path: &str,
) -> DbResult<()> {
    sqlx::query("UPDATE segments SET last_frame_path = ?, updated_at = ? WHERE project_id = ? AND idx = ?")
        .bind(last_frame_path)
        .bind(Utc::now().to_rfc3339())
        .bind(project_id.as_str())
        .bind(index)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_analysis_result(
    pool: &SqlitePool,
    project_id: ProjectId,
    index: i64,
    video_description: &str,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE segments SET video_description = ?, status = 'completed', updated_at = ? \
         WHERE project_id = ? AND idx = ?",
    )
    .bind(video_description)
    .bind(Utc::now().to_rfc3339())
    .bind(project_id.as_str())
    .bind(index)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent segment at an index below `before_index` that has a last
/// frame recorded — the seed image for the next segment's video prompt.
/// Grounded on `original_source/.../server/worker.py::_latest_frame_before`.
pub async fn latest_frame_before(
    pool: &SqlitePool,
    project_id: ProjectId,
    before_index: i64,
) -> DbResult<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT last_frame_path FROM segments WHERE project_id = ? AND idx < ? \
         AND last_frame_path IS NOT NULL ORDER BY idx DESC LIMIT 1",
    )
    .bind(project_id.as_str())
    .bind(before_index)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(p,)| p))
}
