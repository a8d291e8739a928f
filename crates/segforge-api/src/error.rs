//! API error type and its HTTP response mapping.
//!
//! Every variant carries a stable machine `detail` code, matching
//! `original_source/.../server/routes/*.py`'s `HTTPException(status_code=..,
//! detail="CODE")` convention (SPEC_FULL.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("AUTH_REQUIRED")]
    AuthRequired,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("OVERLOADED")]
    Overloaded,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        ApiError::NotFound(detail.into())
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError::BadRequest(detail.into())
    }

    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d.clone()),
            ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED".to_string()),
            ApiError::Unauthorized(d) => (StatusCode::UNAUTHORIZED, d.clone()),
            ApiError::Forbidden(d) => (StatusCode::FORBIDDEN, d.clone()),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d.clone()),
            ApiError::RateLimited(d) => (StatusCode::TOO_MANY_REQUESTS, d.clone()),
            ApiError::PayloadTooLarge(d) => (StatusCode::PAYLOAD_TOO_LARGE, d.clone()),
            ApiError::Overloaded => (StatusCode::SERVICE_UNAVAILABLE, "OVERLOADED".to_string()),
            ApiError::Internal(d) => (StatusCode::INTERNAL_SERVER_ERROR, d.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            tracing::error!(%detail, "request failed");
        }
        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<segforge_db::DbError> for ApiError {
    fn from(e: segforge_db::DbError) -> Self {
        match e {
            segforge_db::DbError::NotFound => ApiError::NotFound("Not found".to_string()),
            segforge_db::DbError::Conflict(d) => ApiError::BadRequest(d),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<segforge_storage::StorageError> for ApiError {
    fn from(e: segforge_storage::StorageError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<segforge_media::MediaError> for ApiError {
    fn from(e: segforge_media::MediaError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<segforge_llm::LlmError> for ApiError {
    fn from(e: segforge_llm::LlmError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<segforge_worker::WorkerError> for ApiError {
    fn from(e: segforge_worker::WorkerError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}
