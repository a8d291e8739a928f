//! Auth DTOs, grounded on `original_source/src/autosedance/server/schemas.py`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AuthRequestCodeIn {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AuthVerifyCodeIn {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AuthMeOut {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AuthOkOut {
    pub ok: bool,
}

impl Default for AuthOkOut {
    fn default() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegisterIn {
    pub invite_code: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
    pub country: String,
    pub referral: String,
    #[serde(default)]
    pub opinion: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LoginIn {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RegisterOut {
    pub authenticated: bool,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub invites: Vec<String>,
}
