//! `analyze(i)` handler: describe a segment's uploaded video with a
//! multimodal LLM call over its last frame, append the description to the
//! project's canon, and advance the cursor past it.
//!
//! Grounded on `original_source/.../server/worker.py::_run_analyze_job`.
//! [`analyze`] is the shared core both the job-queued `run()` and
//! `segforge-api`'s synchronous `POST .../segments/{i}/analyze` call into; it
//! preserves the original's `analyzing` -> `failed`-on-error status wrapper.

use serde_json::Value;

use segforge_models::ids::ProjectId;
use segforge_models::job::Job;
use segforge_models::segment::SegmentStatus;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::{report, segment_index_param};

const CANON_DESCRIPTION_MAX_CHARS: usize = 240;

pub async fn run(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    let project_id = job.project_id;
    let index = job
        .payload
        .get("index")
        .and_then(Value::as_i64)
        .ok_or_else(|| WorkerError::job_failed("payload missing index"))?;

    let params = segment_index_param(index);
    report(ctx, job.id, 15, "jobmsg.analyze.extracting_frame", Some(params.clone())).await?;
    report(ctx, job.id, 55, "jobmsg.analyze.calling_llm", Some(params)).await?;

    let description = analyze(ctx, project_id, index).await?;

    Ok(serde_json::json!({ "index": index, "video_description": description }))
}

/// Set the segment to `analyzing`, extract its last frame, call the image
/// LLM for a description, append a compacted canon entry, advance the
/// cursor, and persist. Falls back to `failed` on any error. Returns the
/// full (uncompacted) description.
pub async fn analyze(ctx: &JobContext, project_id: ProjectId, index: i64) -> WorkerResult<String> {
    segforge_db::segments::set_status(&ctx.pool, project_id, index, SegmentStatus::Analyzing).await?;

    let result = analyze_inner(ctx, project_id, index).await;
    if result.is_err() {
        segforge_db::segments::set_status(&ctx.pool, project_id, index, SegmentStatus::Failed).await?;
    }
    result
}

async fn analyze_inner(ctx: &JobContext, project_id: ProjectId, index: i64) -> WorkerResult<String> {
    let project = segforge_db::projects::get(&ctx.pool, project_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed("project not found"))?;
    let segment = segforge_db::segments::get(&ctx.pool, project_id, index)
        .await?
        .ok_or_else(|| WorkerError::job_failed("segment not found"))?;

    let layout = segforge_storage::ProjectLayout::new(&ctx.projects_root, project_id);
    let frame_path = layout.frame_path(index);
    let video_path = segment
        .video_path
        .as_deref()
        .ok_or_else(|| WorkerError::job_failed("segment has no uploaded video"))?;
    segforge_media::extract_last_frame(video_path, &frame_path).await?;

    let (start_s, end_s) = project.time_range(index);
    let system = "You describe the contents of a single video frame for continuity context \
                  in a multi-segment production pipeline.";
    let user = format!(
        "segment_script: {}\ntime_range: {start_s}s-{end_s}s\nDescribe what is visible, in a few sentences.",
        segment.segment_script
    );

    let description = ctx.llm.image_chat(system, &user, &frame_path).await?;
    if description.trim().is_empty() {
        return Err(WorkerError::job_failed("LLM returned an empty description"));
    }

    let compact = segforge_storage::compact_description(&description, CANON_DESCRIPTION_MAX_CHARS);
    let canon_item = segforge_storage::canon::format_canon_summary(index, start_s, end_s, &compact);
    let canon_summaries = segforge_storage::append(&project.canon_summaries, &canon_item);

    let frame_str = frame_path.to_str().unwrap_or_default();
    segforge_db::segments::set_analysis_result(&ctx.pool, project_id, index, &description).await?;
    segforge_db::projects::apply_analysis_advance(&ctx.pool, project_id, &canon_summaries, index + 1, frame_str)
        .await?;

    Ok(description)
}
