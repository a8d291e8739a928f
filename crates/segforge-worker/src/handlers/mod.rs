//! The five job handlers, dispatched by job type.
//!
//! Grounded on `original_source/.../server/worker.py`'s `_run_*_job`
//! functions; progress percentages and `ui_message` keys match that file so
//! any locale file written against the original's key set still resolves.

pub mod analyze;
pub mod assemble;
pub mod extract_frame;
pub mod full_script;
pub mod segment_generate;

pub use analyze::analyze;
pub use assemble::assemble_project;
pub use extract_frame::extract_frame;
pub use full_script::generate_full_script;
pub use segment_generate::{export_segment_text, generate_segment};

use serde_json::Value;

use segforge_models::ids::JobId;
use segforge_models::job::{ui_message, Job, JobType};

use crate::context::JobContext;
use crate::error::WorkerResult;

/// Run the handler for `job.job_type`, returning the `result.data` payload on
/// success. Progress/ui_message reporting happens inside each handler via
/// [`report`]; the caller (executor) is responsible for the final
/// succeeded/failed transition.
pub async fn dispatch(ctx: &JobContext, job: &Job) -> WorkerResult<Value> {
    match job.job_type {
        JobType::FullScript => full_script::run(ctx, job).await,
        JobType::SegmentGenerate => segment_generate::run(ctx, job).await,
        JobType::ExtractFrame => extract_frame::run(ctx, job).await,
        JobType::Analyze => analyze::run(ctx, job).await,
        JobType::Assemble => assemble::run(ctx, job).await,
    }
}

/// Update `progress`/`message` and merge a `{ui_message:{key,params}}` patch
/// into the job's `result`, matching `_set_job`'s merge-not-replace contract
/// (`segforge_db::jobs::merge_result`).
pub(crate) async fn report(
    ctx: &JobContext,
    job_id: JobId,
    progress: i32,
    key: &str,
    params: Option<Value>,
) -> WorkerResult<()> {
    let message = key.to_string();
    segforge_db::jobs::set_progress(&ctx.pool, job_id, progress, &message).await?;
    segforge_db::jobs::merge_result(&ctx.pool, job_id, &ui_message(key, params)).await?;
    Ok(())
}

pub(crate) fn segment_index_param(index: i64) -> Value {
    serde_json::json!({ "n": format!("{:03}", index + 1) })
}
