//! The Job Engine's poll loop.
//!
//! Shape (a `watch`-channel shutdown signal driving a `tokio::select!` loop)
//! kept from the teacher's `vclip-worker::executor::JobExecutor`; the body
//! is rewritten to dequeue from the DB `jobs` table — via
//! `segforge_db::jobs::claim_next`'s atomic claim, which folds the
//! original's separate "peek oldest queued / check no sibling running"
//! steps into one conditional `UPDATE` — instead of consuming a Redis
//! stream. Loop cadence and never-die behavior grounded on
//! `original_source/.../server/worker.py::_loop`.

use segforge_models::job::JobStatus;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::handlers;

pub struct JobExecutor {
    config: WorkerConfig,
    ctx: JobContext,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, ctx: JobContext) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self { config, ctx, shutdown }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until `shutdown()` is called. Never returns `Err` — any
    /// unexpected error is logged and the loop backs off and continues, per
    /// SPEC_FULL.md §4.6's "the worker loop must never die".
    pub async fn run(&self) {
        info!("job engine poll loop starting");
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.tick().await {
                Ok(true) => {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(self.config.busy_poll_interval) => {}
                    }
                }
                Ok(false) => {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(self.config.idle_poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "job engine tick failed unexpectedly");
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }

        info!("job engine poll loop stopped");
    }

    /// Claim and run at most one job. Returns `Ok(true)` if a job was
    /// claimed (whether it succeeded or failed), `Ok(false)` if the queue
    /// had nothing claimable right now.
    async fn tick(&self) -> WorkerResult<bool> {
        let Some(job) = segforge_db::jobs::claim_next(&self.ctx.pool).await? else {
            return Ok(false);
        };

        info!(job_id = %job.id, project_id = %job.project_id, job_type = %job.job_type, "claimed job");
        segforge_db::jobs::merge_result(
            &self.ctx.pool,
            job.id,
            &segforge_models::job::ui_message("jobmsg.running", None),
        )
        .await?;

        match handlers::dispatch(&self.ctx, &job).await {
            Ok(data) => {
                segforge_db::jobs::merge_result(
                    &self.ctx.pool,
                    job.id,
                    &serde_json::json!({ "data": data, "ui_message": {"key": "jobmsg.succeeded"} }),
                )
                .await?;
                segforge_db::jobs::finish(&self.ctx.pool, job.id, JobStatus::Succeeded, None).await?;
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "job handler failed");
                segforge_db::jobs::merge_result(
                    &self.ctx.pool,
                    job.id,
                    &serde_json::json!({ "ui_message": {"key": "jobmsg.failed"} }),
                )
                .await?;
                segforge_db::jobs::finish(&self.ctx.pool, job.id, JobStatus::Failed, Some(&e.to_string())).await?;
            }
        }

        Ok(true)
    }
}
