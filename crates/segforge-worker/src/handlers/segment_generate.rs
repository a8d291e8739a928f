//! `segment_generate(i)` handler: derive one segment's script and video
//! prompt from the full script, recent canon context, and user feedback.
//!
//! Grounded on `original_source/.../server/worker.py::_run_segment_generate_job`
//! and `utils.py::export_segment_text` (segment `.txt` export template).
//! [`generate_segment`] is the shared core both the job-queued `run()` and
//! `segforge-api`'s synchronous `POST .../segments/{i}/generate` call into.

use serde_json::Value;

use segforge_models::ids::ProjectId;
use segforge_models::job::Job;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::{report, segment_index_param};

const CANON_RECENT_WINDOW: usize = 3;

pub async fn run(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    let project_id = job.project_id;
    let index = job
        .payload
        .get("index")
        .and_then(Value::as_i64)
        .ok_or_else(|| WorkerError::job_failed("payload missing index"))?;
    let feedback = job.payload.get("feedback").and_then(Value::as_str);
    let locale = job.payload.get("locale").and_then(Value::as_str).unwrap_or("en");

    let params = segment_index_param(index);
    report(ctx, job.id, 5, "jobmsg.segment.invalidating", Some(params.clone())).await?;
    report(ctx, job.id, 20, "jobmsg.segment.calling_llm", Some(params.clone())).await?;

    let (segment_script, video_prompt) = generate_segment(ctx, project_id, index, feedback, locale).await?;

    report(ctx, job.id, 90, "jobmsg.segment.writing", Some(params)).await?;

    Ok(serde_json::json!({
        "index": index,
        "segment_script": segment_script,
        "video_prompt": video_prompt,
    }))
}

/// Invalidate segments downstream of `index`, trim canon and reseed the last
/// frame, call the text LLM for this segment's script/prompt, and persist
/// both to the DB and `segments/segment_<NNN>.txt`. Returns
/// `(segment_script, video_prompt)`.
pub async fn generate_segment(
    ctx: &JobContext,
    project_id: ProjectId,
    index: i64,
    feedback: Option<&str>,
    locale: &str,
) -> WorkerResult<(String, String)> {
    let project = segforge_db::projects::get(&ctx.pool, project_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed("project not found"))?;

    let full_script = project
        .full_script
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WorkerError::job_failed("full script has not been generated yet"))?
        .to_string();

    let total_segments = project.num_segments();
    if index < 0 || index >= total_segments {
        return Err(WorkerError::job_failed(format!(
            "segment index {index} out of range (0..{total_segments})"
        )));
    }

    segforge_db::segments::invalidate_downstream(&ctx.pool, project_id, index + 1).await?;
    let trimmed_canon = segforge_storage::before_index(&project.canon_summaries, index);
    let last_frame = segforge_db::segments::latest_frame_before(&ctx.pool, project_id, index).await?;
    segforge_db::projects::apply_cascade(&ctx.pool, project_id, &trimmed_canon, index, last_frame.as_deref())
        .await?;

    let recent_canon = segforge_storage::canon_recent(&trimmed_canon, CANON_RECENT_WINDOW);
    let (start_s, end_s) = project.time_range(index);

    let system = "You write one segment of a short-form video screenplay, \
                  continuing smoothly from the prior segments' canon context.";
    let user = serde_json::json!({
        "full_script": full_script,
        "canon_recent": recent_canon,
        "index": index,
        "start_seconds": start_s,
        "end_seconds": end_s,
        "feedback": feedback,
        "locale": locale,
    })
    .to_string();

    let raw = ctx.llm.text_chat(system, &user).await?;
    let parsed = segforge_queue::extract_json(&raw);
    let segment_script = parsed.get("script").and_then(Value::as_str).unwrap_or("").to_string();
    let video_prompt = parsed.get("video_prompt").and_then(Value::as_str).unwrap_or("").to_string();

    segforge_db::segments::upsert_script(&ctx.pool, project_id, index, &segment_script, &video_prompt).await?;

    let layout = segforge_storage::ProjectLayout::new(&ctx.projects_root, project_id);
    layout.ensure_dirs().await?;
    let text = export_segment_text(index, start_s, end_s, &segment_script, &video_prompt);
    segforge_storage::ProjectLayout::atomic_write_text(layout.segment_txt_path(index), &text).await?;

    Ok((segment_script, video_prompt))
}

pub fn export_segment_text(index: i64, start_s: i64, end_s: i64, script: &str, video_prompt: &str) -> String {
    format!(
        "# Segment {:03}\n\n## Time range\n{start_s}s - {end_s}s\n\n## Script\n{script}\n\n## Video prompt\n{video_prompt}\n\n---\ngenerated_at: {}\n",
        index + 1,
        chrono::Utc::now().to_rfc3339(),
    )
}
