//! `full_script` handler: regenerate the screenplay and invalidate every
//! segment, since the whole downstream pipeline is keyed off the script.
//!
//! Grounded on `original_source/.../server/worker.py::_run_full_script_job`.
//! [`generate_full_script`] is the shared core both the job-queued `run()`
//! and `segforge-api`'s synchronous `POST .../full_script/generate` call
//! into, the same split `handlers::assemble` uses for `assemble_project`.

use serde_json::Value;

use segforge_models::ids::ProjectId;
use segforge_models::job::Job;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::report;

pub async fn run(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    let project_id = job.project_id;
    let feedback = job.payload.get("feedback").and_then(Value::as_str);
    let locale = job.payload.get("locale").and_then(Value::as_str).unwrap_or("en");

    report(ctx, job.id, 5, "jobmsg.full_script.invalidating", None).await?;
    report(ctx, job.id, 20, "jobmsg.full_script.calling_llm", None).await?;
    let script = generate_full_script(ctx, project_id, feedback, locale).await?;
    report(ctx, job.id, 90, "jobmsg.full_script.writing", None).await?;

    Ok(serde_json::json!({ "full_script": script }))
}

/// Invalidate every segment, call the text LLM for a fresh screenplay, and
/// persist it to both the `projects` row and `full_script.txt`. Returns the
/// generated script text.
pub async fn generate_full_script(
    ctx: &JobContext,
    project_id: ProjectId,
    feedback: Option<&str>,
    locale: &str,
) -> WorkerResult<String> {
    let project = segforge_db::projects::get(&ctx.pool, project_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed("project not found"))?;

    segforge_db::segments::invalidate_all(&ctx.pool, project_id).await?;

    let system = "You are a screenplay generator for short-form video production.";
    let user = serde_json::json!({
        "user_prompt": project.user_prompt,
        "pacing": project.pacing,
        "feedback": feedback,
        "total_duration_seconds": project.total_duration_seconds,
        "segment_duration": project.segment_duration,
        "locale": locale,
    })
    .to_string();

    let script = ctx.llm.text_chat(system, &user).await?;
    if script.trim().is_empty() {
        return Err(WorkerError::job_failed("LLM returned an empty script"));
    }

    segforge_db::projects::update_full_script(&ctx.pool, project_id, &script, "", 0, None, None).await?;

    let layout = segforge_storage::ProjectLayout::new(&ctx.projects_root, project_id);
    layout.ensure_dirs().await?;
    segforge_storage::ProjectLayout::atomic_write_text(layout.full_script_path(), &script).await?;

    Ok(script)
}
