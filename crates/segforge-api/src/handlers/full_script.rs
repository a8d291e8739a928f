//! Full-script endpoints: synchronous generate, and direct text replace.
//!
//! Grounded on `original_source/.../server/routes/full_script.py`.

use axum::extract::{Path, State};
use axum::Json;

use segforge_models::project::{GenerateWithFeedbackIn, ProjectDetailOut, UpdateFullScriptIn};
use segforge_models::ProjectId;

use crate::auth::WriteUser;
use crate::authz::require_project_owner;
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto;
use crate::state::AppState;

pub async fn generate(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path(project_id): Path<String>,
    Json(payload): Json<GenerateWithFeedbackIn>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let locale = payload.locale.as_deref().unwrap_or("en");
    let ctx = segforge_worker::JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
    segforge_worker::handlers::generate_full_script(&ctx, project_id, payload.feedback.as_deref(), locale)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;
    Ok(Json(dto::project_detail(&project, &segments)))
}

pub async fn update(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path(project_id): Path<String>,
    Json(payload): Json<UpdateFullScriptIn>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let existing = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    if payload.invalidate_downstream {
        segforge_db::segments::invalidate_all(&state.pool, project_id).await?;
        segforge_db::projects::update_full_script(&state.pool, project_id, &payload.full_script, "", 0, None, None)
            .await?;
    } else {
        segforge_db::projects::update_full_script(
            &state.pool,
            project_id,
            &payload.full_script,
            &existing.canon_summaries,
            existing.current_segment_index,
            existing.last_frame_path.as_deref(),
            existing.final_video_path.as_deref(),
        )
        .await?;
    }

    let layout = state.layout(project_id);
    layout.ensure_dirs().await?;
    segforge_storage::ProjectLayout::atomic_write_text(layout.full_script_path(), &payload.full_script).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;
    Ok(Json(dto::project_detail(&project, &segments)))
}
