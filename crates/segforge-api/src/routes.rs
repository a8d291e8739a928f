//! API routes: projects/full_script/segments/jobs/auth/health, wired onto
//! the overload-shedding + security/CORS/logging middleware stack.
//!
//! Grounded on `original_source/.../server/app.py` (route mounting) and
//! SPEC_FULL.md §4.7/§6.

use axum::middleware as axum_middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{auth, full_script, health, jobs, projects, segments};
use crate::middleware::{cors_layer, overload_shedding, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route("/projects/:project_id", get(projects::get_project))
        .route("/projects/:project_id/assemble", post(projects::assemble_project))
        .route("/projects/:project_id/final", get(projects::get_final_video))
        .route("/projects/:project_id/full_script/generate", post(full_script::generate))
        .route("/projects/:project_id/full_script", put(full_script::update))
        .route("/projects/:project_id/segments/:index/generate", post(segments::generate))
        .route("/projects/:project_id/segments/:index", put(segments::update))
        .route("/projects/:project_id/segments/:index", get(segments::get))
        .route("/projects/:project_id/segments/:index/video", post(segments::upload_video))
        .route("/projects/:project_id/segments/:index/video", get(segments::stream_video))
        .route("/projects/:project_id/segments/:index/extract_frame", post(segments::extract_frame))
        .route("/projects/:project_id/segments/:index/analyze", post(segments::analyze))
        .route("/projects/:project_id/segments/:index/frame", get(segments::stream_frame))
        .route("/projects/:project_id/segments/:index/frame/download", get(segments::download_frame))
        .route("/projects/:project_id/jobs", post(jobs::create))
        .route("/projects/:project_id/jobs", get(jobs::list))
        .route("/projects/:project_id/jobs/:job_id", get(jobs::get));

    let auth_routes = Router::new()
        .route("/auth/request_code", post(auth::request_code))
        .route("/auth/verify_code", post(auth::verify_code))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/invites", get(auth::list_invites))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout));

    let health_routes = Router::new()
        .route("/health", get(health::ok))
        .route("/healthz", get(health::health))
        .route("/ready", get(health::ready));

    Router::new()
        .nest("/api", project_routes.merge(auth_routes))
        .merge(health_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), overload_shedding))
        .layer(axum_middleware::from_fn(security_headers))
        .layer(axum_middleware::from_fn(request_id))
        .layer(axum_middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
