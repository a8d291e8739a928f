//! Health check handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Liveness probe: `GET /api/health`. Bypasses auth and the overload
/// semaphore (SPEC_FULL.md §6).
pub async fn ok() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Richer status payload kept at `/healthz` for operators.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
pub async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ready" }))
}
