//! Project repository.
//!
//! Grounded on `original_source/.../server/models.py::Project` and the
//! `create_project`/`list_projects`/`get_project` handlers in
//! `server/routes/projects.py`.

use chrono::Utc;
use sqlx::SqlitePool;

use segforge_models::{Pacing, Project, ProjectId};

use crate::error::{DbError, DbResult};
use crate::row::ProjectRow;

pub async fn insert(
    pool: &SqlitePool,
    user_prompt: &str,
    pacing: Pacing,
    total_duration_seconds: i64,
    segment_duration: i64,
) -> DbResult<Project> {
    let id = ProjectId::new();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO projects (id, user_prompt, pacing, total_duration_seconds, segment_duration, \
         full_script, canon_summaries, current_segment_index, last_frame_path, final_video_path, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, '', 0, NULL, NULL, ?, ?)",
    )
    .bind(id.as_str())
    .bind(pacing.to_string())
    .bind(total_duration_seconds)
    .bind(segment_duration)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    get(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get(pool: &SqlitePool, id: ProjectId) -> DbResult<Option<Project>> {
    let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(ProjectRow::into_model).transpose()?)
}

pub async fn list_for_principal(pool: &SqlitePool, principal_id: &str) -> DbResult<Vec<Project>> {
    let rows: Vec<ProjectRow> = if principal_id.is_empty() {
        sqlx::query_as("SELECT * FROM projects ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as(
            "SELECT p.* FROM projects p \
             JOIN project_owners o ON o.project_id = p.id \
             WHERE o.principal_id = ? ORDER BY p.created_at DESC",
        )
        .bind(principal_id)
        .fetch_all(pool)
        .await?
    };
    rows.into_iter().map(ProjectRow::into_model).collect::<Result<_, _>>().map_err(Into::into)
}

pub async fn add_owner(pool: &SqlitePool, project_id: ProjectId, principal_id: &str) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO project_owners (project_id, principal_id, created_at) VALUES (?, ?, ?)")
        .bind(project_id.as_str())
        .bind(principal_id)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_owner(pool: &SqlitePool, project_id: ProjectId, principal_id: &str) -> DbResult<bool> {
    if principal_id.is_empty() {
        return Ok(true);
    }
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM project_owners WHERE project_id = ? AND principal_id = ? LIMIT 1",
    )
    .bind(project_id.as_str())
    .bind(principal_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Update the full script and the invalidation-adjacent fields that
/// `full_script/generate` and `PUT full_script` both touch; callers pass
/// the already-decided reset values so the two call sites share one query.
#[allow(clippy::too_many_arguments)]
pub async fn update_full_script(
    pool: &SqlitePool,
    id: ProjectId,
    full_script: &str,
    canon_summaries: &str,
    current_segment_index: i64,
    last_frame_path: Option<&str>,
    final_video_path: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE projects SET full_script = ?, canon_summaries = ?, current_segment_index = ?, \
         last_frame_path = ?, final_video_path = ?, updated_at = ? WHERE id = ?",
    )
    .bind(full_script)
    .bind(canon_summaries)
    .bind(current_segment_index)
    .bind(last_frame_path)
    .bind(final_video_path)
    .bind(Utc::now().to_rfc3339())
    .bind(id.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Apply the fields a `segment_generate`/segment-edit cascade mutates on the
/// parent project: canon trim, reseeded last frame, cleared final video, and
/// the cursor.
pub async fn apply_cascade(
    pool: &SqlitePool,
    id: ProjectId,
    canon_summaries: &str,
    current_segment_index: i64,
    last_frame_path: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE projects SET canon_summaries = ?, current_segment_index = ?, last_frame_path = ?, \
         final_video_path = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(canon_summaries)
    .bind(current_segment_index)
    .bind(last_frame_path)
    .bind(Utc::now().to_rfc3339())
    .bind(id.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_final_video_path(pool: &SqlitePool, id: ProjectId, path: Option<&str>) -> DbResult<()> {
    sqlx::query("UPDATE projects SET final_video_path = ?, updated_at = ? WHERE id = ?")
        .bind(path)
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Append one item to `canon_summaries`, advance the cursor to `next_index`,
/// reseed `last_frame_path`, and clear `final_video_path` — the mutation
/// `analyze` applies to the parent project on success.
pub async fn apply_analysis_advance(
    pool: &SqlitePool,
    id: ProjectId,
    canon_summaries: &str,
    next_index: i64,
    last_frame_path: &str,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE projects SET canon_summaries = ?, current_segment_index = ?, last_frame_path = ?, \
         final_video_path = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(canon_summaries)
    .bind(next_index)
    .bind(last_frame_path)
    .bind(Utc::now().to_rfc3339())
    .bind(id.as_str())
    .execute(pool)
    .await?;
    Ok(())
}
