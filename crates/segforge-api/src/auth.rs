//! Session-cookie authentication.
//!
//! Replaces the teacher's Firebase ID-token `JwksCache`/`AuthUser` extractor
//! (RS256 verification against Google's JWKS) with an opaque session token
//! whose HMAC-SHA256 digest is looked up in `auth_sessions`, per
//! `original_source/.../server/auth.py::{hash_session_token,
//! get_current_user}`. The `FromRequestParts<AppState>` extractor shape is
//! kept as the teacher built it.

use std::sync::OnceLock;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

static EPHEMERAL_SECRET: OnceLock<Vec<u8>> = OnceLock::new();

fn secret_bytes(configured: &Option<String>) -> Vec<u8> {
    if let Some(s) = configured {
        return s.as_bytes().to_vec();
    }
    EPHEMERAL_SECRET
        .get_or_init(|| {
            warn!("AUTH_SECRET_KEY is unset; using an ephemeral per-process secret (dev-only)");
            let mut bytes = vec![0u8; 32];
            rand::Rng::fill(&mut rand::thread_rng(), bytes.as_mut_slice());
            bytes
        })
        .clone()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_hex(secret: &[u8], value: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(value.as_bytes());
    to_hex(&mac.finalize().into_bytes())
}

pub fn hash_otp(secret: &Option<String>, email: &str, code: &str) -> String {
    hmac_hex(&secret_bytes(secret), &format!("otp:{email}:{code}"))
}

/// Constant-time comparison of two OTP hashes (SPEC_FULL.md §4.4 overrides
/// the original's plain `==` scan).
pub fn otp_hash_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub fn new_session_token() -> String {
    use base64::Engine;
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_session_token(secret: &Option<String>, token: &str) -> String {
    hmac_hex(&secret_bytes(secret), &format!("sess:{token}"))
}

/// The authenticated principal, or the anonymous placeholder used when auth
/// is disabled/optional (matches `original_source`'s `AuthUser(user_id="",
/// session_id="")` fallback).
#[derive(Debug, Clone, Default)]
pub struct AuthUser {
    pub principal_id: String,
    pub session_id: Option<String>,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn is_anonymous(&self) -> bool {
        self.principal_id.is_empty()
    }
}

async fn current_user(parts: &Parts, state: &AppState) -> Option<AuthUser> {
    if !state.config.auth_enabled {
        return None;
    }
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(&state.config.session_cookie_name)?.value().to_string();
    let token_hash = hash_session_token(&state.config.auth_secret_key, &token);

    let row = segforge_db::sessions::find_live_by_token_hash(&state.pool, &token_hash)
        .await
        .ok()
        .flatten()?;

    segforge_db::sessions::touch_last_seen(&state.pool, &row.id).await;

    let email = row.principal_id.contains('@').then(|| row.principal_id.clone());
    Some(AuthUser { principal_id: row.principal_id, session_id: Some(row.id), email })
}

/// Extractor for endpoints that tolerate anonymous access when auth is
/// disabled, but must see `Some` whenever a live session cookie is present.
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(current_user(parts, state).await))
    }
}

/// Extractor for read endpoints: requires a session only when
/// `auth_require_for_reads` is set, otherwise degrades to the anonymous
/// principal (`original_source::require_read_user`).
pub struct ReadUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for ReadUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state).await;
        if !state.config.auth_enabled || !state.config.auth_require_for_reads {
            return Ok(ReadUser(user.unwrap_or_default()));
        }
        user.map(ReadUser).ok_or(ApiError::AuthRequired)
    }
}

/// Extractor for write endpoints: requires a session only when
/// `auth_require_for_writes` is set (`original_source::require_user`).
pub struct WriteUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for WriteUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state).await;
        if !state.config.auth_enabled || !state.config.auth_require_for_writes {
            return Ok(WriteUser(user.unwrap_or_default()));
        }
        user.map(WriteUser).ok_or(ApiError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_hash_is_deterministic() {
        let secret = Some("fixed-secret".to_string());
        let token = "abc123";
        assert_eq!(hash_session_token(&secret, token), hash_session_token(&secret, token));
    }

    #[test]
    fn otp_hash_eq_is_case_sensitive_exact_match() {
        assert!(otp_hash_eq("deadbeef", "deadbeef"));
        assert!(!otp_hash_eq("deadbeef", "deadbeee"));
    }
}
