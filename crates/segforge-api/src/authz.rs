//! Project ownership checks.
//!
//! Grounded on `original_source/.../server/authz.py::require_project_owner`:
//! a miss returns 404 rather than 403 so an unauthorized caller cannot
//! distinguish "not yours" from "doesn't exist"; an empty principal id (auth
//! disabled) is a no-op.

use sqlx::SqlitePool;

use segforge_models::ProjectId;

use crate::error::{ApiError, ApiResult};

pub async fn require_project_owner(pool: &SqlitePool, project_id: ProjectId, principal_id: &str) -> ApiResult<()> {
    if segforge_db::projects::is_owner(pool, project_id, principal_id).await? {
        Ok(())
    } else {
        Err(ApiError::not_found("Project not found"))
    }
}
