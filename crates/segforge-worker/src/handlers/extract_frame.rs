//! `extract_frame(i)` handler: pull the last frame of a segment's uploaded
//! video so it can seed the next segment's generation prompt.
//!
//! Grounded on `original_source/.../server/worker.py::_run_extract_frame_job`.
//! [`extract_frame`] is the shared core both the job-queued `run()` and
//! `segforge-api`'s synchronous `POST .../segments/{i}/extract_frame` call
//! into.

use serde_json::Value;

use segforge_models::ids::ProjectId;
use segforge_models::job::Job;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::{report, segment_index_param};

pub async fn run(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    let project_id = job.project_id;
    let index = job
        .payload
        .get("index")
        .and_then(Value::as_i64)
        .ok_or_else(|| WorkerError::job_failed("payload missing index"))?;

    report(ctx, job.id, 20, "jobmsg.extract_frame.extracting", Some(segment_index_param(index))).await?;

    let frame_str = extract_frame(ctx, project_id, index).await?;

    Ok(serde_json::json!({ "index": index, "last_frame_path": frame_str }))
}

/// Delete any stale frame, run the last-frame extraction against the
/// segment's uploaded video, and persist the resulting path. Returns the
/// frame path.
pub async fn extract_frame(ctx: &JobContext, project_id: ProjectId, index: i64) -> WorkerResult<String> {
    let segment = segforge_db::segments::get(&ctx.pool, project_id, index)
        .await?
        .ok_or_else(|| WorkerError::job_failed("segment not found"))?;

    let video_path = segment
        .video_path
        .as_deref()
        .ok_or_else(|| WorkerError::job_failed("segment has no uploaded video"))?;

    let layout = segforge_storage::ProjectLayout::new(&ctx.projects_root, project_id);
    let frame_path = layout.frame_path(index);
    let _ = tokio::fs::remove_file(&frame_path).await;

    segforge_media::extract_last_frame(video_path, &frame_path).await?;

    let frame_str = frame_path
        .to_str()
        .ok_or_else(|| WorkerError::job_failed("frame path is not valid UTF-8"))?
        .to_string();
    segforge_db::segments::set_last_frame_path(&ctx.pool, project_id, index, &frame_str).await?;

    Ok(frame_str)
}
