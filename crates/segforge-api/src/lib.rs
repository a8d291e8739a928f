//! Axum HTTP API server: the production-pipeline REST surface of
//! SPEC_FULL.md §4.7 — projects/full_script/segments/jobs/auth — plus the
//! session-cookie auth substrate, ownership checks, rate limiting, and
//! overload-shedding middleware of §4.4/§4.7.

pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod handlers;
pub mod invites;
pub mod middleware;
pub mod passwords;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
