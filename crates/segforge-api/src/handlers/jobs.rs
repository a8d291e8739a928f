//! Job endpoints: create, list, get.
//!
//! Grounded on `original_source/.../server/routes/jobs.py`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use segforge_models::job::{CreateJobIn, JobOut};
use segforge_models::ProjectId;

use crate::auth::{ReadUser, WriteUser};
use crate::authz::require_project_owner;
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateJobIn>,
) -> ApiResult<Json<JobOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let body = serde_json::json!({
        "index": payload.index,
        "feedback": payload.feedback,
        "locale": payload.locale,
    });
    let job = segforge_db::jobs::insert(&state.pool, project_id, payload.job_type, &body).await?;
    Ok(Json(dto::job_out(&job)))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path(project_id): Path<String>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobOut>>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let jobs = segforge_db::jobs::list_for_project(&state.pool, project_id, query.limit).await?;
    Ok(Json(jobs.iter().map(dto::job_out).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path((project_id, job_id)): Path<(String, String)>,
) -> ApiResult<Json<JobOut>> {
    let project_id = ProjectId::parse(&project_id).map_err(|_| ApiError::not_found("Project not found"))?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let job_id = segforge_models::ids::JobId::parse(&job_id).map_err(|_| ApiError::not_found("Job not found"))?;
    let job = segforge_db::jobs::get(&state.pool, job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    if job.project_id != project_id {
        return Err(ApiError::not_found("Job not found"));
    }
    Ok(Json(dto::job_out(&job)))
}
