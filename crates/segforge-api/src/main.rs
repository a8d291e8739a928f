//! API process entrypoint.
//!
//! Embeds the Job Engine's poll loop in-process (toggled off via
//! `DISABLE_WORKER`) so a single binary is enough for most deployments;
//! `segforge-worker`'s own `main.rs` remains available for deployments that
//! split it out (SPEC_FULL.md §5).

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use segforge_api::{create_router, AppState};
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

    let config = segforge_api::ApiConfig::from_env();
    let disable_worker = config.disable_worker;
    let host = config.host.clone();
    let port = config.port;

    let state = AppState::new(config).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let executor = if disable_worker {
        None
    } else {
        let worker_config = WorkerConfig::from_env();
        let ctx = JobContext::new(state.pool.clone(), state.config.projects_root.clone(), state.llm.clone());
        let executor = Arc::new(JobExecutor::new(worker_config, ctx));
        let run_executor = executor.clone();
        tokio::spawn(async move { run_executor.run().await });
        Some(executor)
    };

    let app = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!(%addr, "segforge-api listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    if let Some(executor) = executor {
        executor.shutdown();
    }

    Ok(())
}
