//! Segment endpoints: generate(i), update(i), get(i), upload video, stream
//! video/frame, extract_frame(i), analyze(i).
//!
//! Grounded on `original_source/.../server/routes/segments.py`.

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use segforge_models::project::{GenerateWithFeedbackIn, ProjectDetailOut};
use segforge_models::segment::{SegmentDetailOut, UpdateSegmentIn};
use segforge_models::ProjectId;

use crate::auth::{ReadUser, WriteUser};
use crate::authz::require_project_owner;
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto;
use crate::state::AppState;

fn parse_ids(project_id: &str, index: i64) -> ApiResult<ProjectId> {
    if index < 0 {
        return Err(ApiError::bad_request("segment index must be >= 0"));
    }
    ProjectId::parse(project_id).map_err(|_| ApiError::not_found("Project not found"))
}

async fn load_project_detail(state: &AppState, project_id: ProjectId) -> ApiResult<ProjectDetailOut> {
    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segments = segforge_db::segments::list_for_project(&state.pool, project_id).await?;
    Ok(dto::project_detail(&project, &segments))
}

pub async fn generate(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path((project_id, index)): Path<(String, i64)>,
    Json(payload): Json<GenerateWithFeedbackIn>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let locale = payload.locale.as_deref().unwrap_or("en");
    let ctx = segforge_worker::JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
    segforge_worker::handlers::generate_segment(&ctx, project_id, index, payload.feedback.as_deref(), locale)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(load_project_detail(&state, project_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path((project_id, index)): Path<(String, i64)>,
    Json(payload): Json<UpdateSegmentIn>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    segforge_db::segments::update_edit(
        &state.pool,
        project_id,
        index,
        payload.segment_script.as_deref(),
        payload.video_prompt.as_deref(),
    )
    .await?;

    if payload.segment_script.is_some() || payload.video_prompt.is_some() {
        if let Some(segment) = segforge_db::segments::get(&state.pool, project_id, index).await? {
            let (start_s, end_s) = project.time_range(index);
            let layout = segforge_storage::ProjectLayout::new(&state.config.projects_root, project_id);
            layout.ensure_dirs().await?;
            let text = segforge_worker::handlers::export_segment_text(
                index,
                start_s,
                end_s,
                &segment.segment_script,
                &segment.video_prompt,
            );
            segforge_storage::ProjectLayout::atomic_write_text(layout.segment_txt_path(index), &text).await?;
        }
    }

    if payload.invalidate_downstream {
        segforge_db::segments::invalidate_downstream(&state.pool, project_id, index + 1).await?;
        let project = segforge_db::projects::get(&state.pool, project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
        let trimmed_canon = segforge_storage::before_index(&project.canon_summaries, index);
        let last_frame = segforge_db::segments::latest_frame_before(&state.pool, project_id, index).await?;
        segforge_db::projects::apply_cascade(&state.pool, project_id, &trimmed_canon, index, last_frame.as_deref())
            .await?;
    }

    Ok(Json(load_project_detail(&state, project_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path((project_id, index)): Path<(String, i64)>,
) -> ApiResult<Json<SegmentDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    match segforge_db::segments::get(&state.pool, project_id, index).await? {
        Some(segment) => Ok(Json(dto::segment_detail(&project.id.as_str(), &segment, Vec::new()))),
        None => Ok(Json(dto::synthetic_segment_detail(index, &project))),
    }
}

const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv", "webm", "avi"];

pub async fn upload_video(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path((project_id, index)): Path<(String, i64)>,
    mut multipart: Multipart,
) -> ApiResult<Json<SegmentDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
        .ok_or_else(|| ApiError::bad_request("multipart body has no file field"))?;

    let original_filename = field.file_name().map(|s| s.to_string());
    let ext = original_filename
        .as_deref()
        .and_then(|f| f.rsplit_once('.'))
        .map(|(_, e)| e.to_ascii_lowercase());
    if !ext.as_deref().map(|e| ALLOWED_VIDEO_EXTENSIONS.contains(&e)).unwrap_or(false) {
        return Err(ApiError::bad_request("UNSUPPORTED_VIDEO_TYPE"));
    }

    let layout = state.layout(project_id);
    layout.ensure_dirs().await?;
    let dest = layout.input_video_path(index, original_filename.as_deref());

    let max_bytes = state.config.max_upload_mb * 1024 * 1024;
    write_multipart_field_to_file(field, &dest, max_bytes).await?;

    let dest_str = dest.to_str().ok_or_else(|| ApiError::Internal("upload path is not valid UTF-8".into()))?;

    let mut warnings = Vec::new();
    let frame_path = layout.frame_path(index);
    let _ = tokio::fs::remove_file(&frame_path).await;
    let extracted_frame = match segforge_media::extract_last_frame(&dest, &frame_path).await {
        Ok(path) => path.to_str().map(|s| s.to_string()),
        Err(_) => {
            warnings.push("Failed to extract last frame".to_string());
            None
        }
    };

    segforge_db::segments::set_video(&state.pool, project_id, index, dest_str, extracted_frame.as_deref()).await?;
    segforge_db::projects::set_final_video_path(&state.pool, project_id, None).await?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segment = segforge_db::segments::get(&state.pool, project_id, index)
        .await?
        .ok_or_else(|| ApiError::not_found("Segment not found"))?;
    Ok(Json(dto::segment_detail(&project.id.as_str(), &segment, warnings)))
}

/// Stream a multipart file field to `dest` in bounded chunks, aborting once
/// the running total exceeds `max_bytes` (SPEC_FULL.md §5: "bodies are
/// written chunk-by-chunk ... abort with 413 when a running total exceeds
/// max_upload_mb").
async fn write_multipart_field_to_file(
    mut field: axum::extract::multipart::Field<'_>,
    dest: &std::path::Path,
    max_bytes: u64,
) -> ApiResult<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(dest).await?;
    let mut total: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(|e| ApiError::bad_request(e.to_string()))? {
        total += chunk.len() as u64;
        if total > max_bytes {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(ApiError::PayloadTooLarge("UPLOAD_TOO_LARGE".to_string()));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

pub async fn stream_video(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path((project_id, index)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let segment = segforge_db::segments::get(&state.pool, project_id, index)
        .await?
        .ok_or_else(|| ApiError::not_found("Segment not found"))?;
    let path = segment.video_path.ok_or_else(|| ApiError::not_found("Segment has no video"))?;
    stream_file(&path).await
}

pub async fn extract_frame(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path((project_id, index)): Path<(String, i64)>,
) -> ApiResult<Json<SegmentDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let ctx = segforge_worker::JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
    segforge_worker::handlers::extract_frame(&ctx, project_id, index)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let project = segforge_db::projects::get(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let segment = segforge_db::segments::get(&state.pool, project_id, index)
        .await?
        .ok_or_else(|| ApiError::not_found("Segment not found"))?;
    Ok(Json(dto::segment_detail(&project.id.as_str(), &segment, Vec::new())))
}

pub async fn analyze(
    State(state): State<AppState>,
    WriteUser(user): WriteUser,
    Path((project_id, index)): Path<(String, i64)>,
) -> ApiResult<Json<ProjectDetailOut>> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let ctx = segforge_worker::JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
    segforge_worker::handlers::analyze(&ctx, project_id, index)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(load_project_detail(&state, project_id).await?))
}

pub async fn stream_frame(
    State(state): State<AppState>,
    ReadUser(user): ReadUser,
    Path((project_id, index)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_ids(&project_id, index)?;
    require_project_owner(&state.pool, project_id, &user.principal_id).await?;

    let segment = segforge_db::segments::get(&state.pool, project_id, index)
        .await?
        .ok_or_else(|| ApiError::not_found("Segment not found"))?;
    let path = segment.last_frame_path.ok_or_else(|| ApiError::not_found("Segment has no frame"))?;
    stream_file(&path).await
}

pub async fn download_frame(
    state: State<AppState>,
    user: ReadUser,
    path: Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    // Same bytes as `stream_frame`; the original exposes a second URL whose
    // only difference is the client-side `Content-Disposition` hint it
    // expects, which callers set via the `download` query param on their
    // own request — there is no server-side distinction to make here.
    stream_frame(state, user, path).await
}

async fn stream_file(path: &str) -> ApiResult<impl IntoResponse> {
    let file = File::open(path).await.map_err(|_| ApiError::not_found("File missing on disk"))?;
    let stream = ReaderStream::new(file);
    Ok(axum::body::Body::from_stream(stream))
}
