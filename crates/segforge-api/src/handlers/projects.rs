//! Project endpoints: create, list, get, assemble, stream final video.
//!
//! Grounded on `original_source/.../server/routes/projects.py`.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use segforge_models::project::{CreateProjectIn, ProjectDetailOut, ProjectSummaryOut};
use segforge_models::ProjectId;

use crate::auth::{ReadUser, WriteUser};
use crate::authz::require_project_owner;
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto;
use crate::state::AppState;

pub async fn create_project(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Json(payload): Json<CreateProjectIn>,
) -> ApiResult<Json<ProjectDetailOut>> {
    if payload.total_duration_seconds <= 0 {
        return Err(ApiError::bad_request("total_duration_seconds must be > 0"));
    }
    if payload.segment_duration <= 0 {
        return Err(ApiError::bad_request("segment_duration must be > 0"));
    }

    let project = segforge_db::projects::insert(
        &state.pool,
        &payload.user_prompt,
        payload.pacing,
        payload.total_duration_seconds,
        payload.segment_duration,
    )
    .await?;

    state.layout(project.id).ensure_dirs().await?;
    if !user.is_anonymous() {
        segforge_db::projects::add_owner(&state.pool, project.id, &user.principal_id).await?;
    }

    Ok(Json(dto::project_detail(&project, &[])))
}

pub async fn list_projects(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
) -> ApiResult<Json<Vec<ProjectSummaryOut>>> {
    let projects = segforge_db::projects::list_for_principal(&state.pool, &user.principal_id).await?;

    let mut out = Vec::with_capacity(projects.len());
    for project in &projects {
        let segments = segforge_db::segments::list_for_project(&state.pool, project.id).await?;
        out.push(dto::project_summary(project, &segments));
    }
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct GetProjectQuery {
    #[serde(default = "default_true_query")]
    pub include_full_script: bool,
    #[serde(default = "default_true_query")]
    pub include_canon: bool,
}

fn default_true_query() -> bool {
    true
}

pub async fn get_project(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path(project_id): Path<String>,
    Query(query): Query<GetProjectQuery>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;

    let mut out = dto::project_detail(&project, &segments);
    if !query.include_full_script {
        out.full_script = None;
    }
    if !query.include_canon {
        out.canon_summaries = String::new();
    }
    Ok(Json(out))
}

pub async fn assemble_project(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;

    let total = project.num_segments();
    let by_index: std::collections::HashMap<i64, &segforge_models::Segment> =
        segments.iter().map(|s| (s.index, s)).collect();
    let missing: Vec<i64> = (0..total)
        .filter(|i| by_index.get(i).and_then(|s| s.video_path.as_ref()).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!("Missing videos for segments: {missing:?}")));
    }

    let ctx = segforge_worker::JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
    segforge_worker::handlers::assemble_project(&ctx, project_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;
    Ok(Json(dto::project_detail(&project, &segments)))
}

pub async fn get_final_video(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let path = project.final_video_path.ok_or_else(|| ApiError::not_found("Final video not found"))?;

    let file = File::open(&path).await.map_err(|_| ApiError::not_found("Final video file missing on disk"))?;
    let stream = ReaderStream::new(file);
    Ok(axum::body::Body::from_stream(stream))
}
