//! `assemble` handler: concatenate every segment's video into the project's
//! final output file.
//!
//! Grounded on `original_source/.../server/worker.py::_run_assemble_job`
//! (note that `routes/projects.py::assemble_project` also exposes a
//! synchronous variant of this same operation outside the job queue, per
//! SPEC_FULL.md §4.7's "assemble (job or synchronous)" handler map entry;
//! `assemble_sync` in `segforge-api` shares this module's core logic).

use serde_json::Value;

use segforge_models::job::Job;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::report;

pub async fn run(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    let project_id = job.project_id;

    report(ctx, job.id, 20, "jobmsg.assemble.running_ffmpeg", None).await?;
    let final_path = assemble_project(ctx, project_id).await?;

    Ok(serde_json::json!({ "final_video_path": final_path }))
}

/// Shared core: require every segment has a video on disk, concatenate them
/// in index order, and persist the resulting path. Exposed so the
/// HTTP surface's synchronous assemble endpoint can call the same logic
/// without going through the job queue.
pub async fn assemble_project(ctx: &JobContext, project_id: segforge_models::ids::ProjectId) -> WorkerResult<String> {
    let project = segforge_db::projects::get(&ctx.pool, project_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed("project not found"))?;
    let segments = segforge_db::segments::list_for_project(&ctx.pool, project_id).await?;

    let total = project.num_segments();
    let mut inputs = Vec::with_capacity(total as usize);
    for index in 0..total {
        let segment = segments
            .iter()
            .find(|s| s.index == index)
            .ok_or_else(|| WorkerError::job_failed(format!("segment {index} has no video")))?;
        let video_path = segment
            .video_path
            .as_deref()
            .ok_or_else(|| WorkerError::job_failed(format!("segment {index} has no video")))?;
        inputs.push(std::path::PathBuf::from(video_path));
    }

    let layout = segforge_storage::ProjectLayout::new(&ctx.projects_root, project_id);
    layout.ensure_dirs().await?;
    let out = layout.final_video_path();

    let concat_mode: segforge_media::ConcatMode = std::env::var("VIDEO_CONCAT_MODE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(segforge_media::ConcatMode::Auto);
    segforge_media::concatenate_videos(&inputs, &out, concat_mode).await?;

    let out_str = out
        .to_str()
        .ok_or_else(|| WorkerError::job_failed("final video path is not valid UTF-8"))?
        .to_string();
    segforge_db::projects::set_final_video_path(&ctx.pool, project_id, Some(&out_str)).await?;

    Ok(out_str)
}
