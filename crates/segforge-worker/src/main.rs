//! Standalone Job Engine process.
//!
//! Most deployments embed `JobExecutor` directly in the `segforge-api`
//! process (toggled off via `DISABLE_WORKER`, per SPEC_FULL.md §5's "single
//! background worker loop"); this binary exists for deployments that prefer
//! to run the worker as its own process, mirroring the teacher's
//! `vclip-worker` binary shape.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use segforge_worker::{JobContext, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = WorkerConfig::from_env();
    let pool = segforge_db::connect(&config.database_url).await?;
    let llm = Arc::new(segforge_llm::HttpLlmClient::from_env()?);
    let ctx = JobContext::new(pool, config.projects_root.clone(), llm);

    let executor = Arc::new(JobExecutor::new(config, ctx));
    let run_executor = executor.clone();
    let run_handle = tokio::spawn(async move { run_executor.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    executor.shutdown();
    run_handle.await?;

    Ok(())
}
