//! Auth endpoints: both accepted variants from SPEC_FULL.md §6 — email OTP
//! and password+invite — plus the shared `me`/`logout`.
//!
//! Grounded on `original_source/.../server/routes/auth.py`. Session cookie
//! issuance/clearing is new (the original runs behind a framework that does
//! this implicitly); shape follows `crate::auth`'s hash/extractor contract.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use validator::ValidateEmail;

use segforge_models::auth::{
    AuthMeOut, AuthOkOut, AuthRequestCodeIn, AuthVerifyCodeIn, LoginIn, RegisterIn, RegisterOut,
};

use crate::auth::{hash_otp, hash_session_token, new_session_token, otp_hash_eq, OptionalAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::invites::{new_invite_code, normalize_invite_code};
use crate::passwords::{hash_password, verify_password};
use crate::ratelimit::enforce_hourly;
use crate::state::AppState;

const REFERRAL_ALLOWLIST: &[&str] = &["friend", "social", "search", "ad", "press", "other"];

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_email(email: &str) -> ApiResult<()> {
    if !email.validate_email() {
        return Err(ApiError::bad_request("EMAIL_INVALID"));
    }
    Ok(())
}

fn check_allowlist(state: &AppState, email: &str) -> ApiResult<()> {
    if state.config.auth_email_allowlist.is_empty() {
        return Ok(());
    }
    if state.config.auth_email_allowlist.iter().any(|e| e.eq_ignore_ascii_case(email)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("EMAIL_NOT_ALLOWED".to_string()))
    }
}

fn build_session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let same_site = match state.config.session_cookie_samesite.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    };
    let mut builder = Cookie::build((state.config.session_cookie_name.clone(), token))
        .http_only(true)
        .secure(state.config.session_cookie_secure)
        .same_site(same_site)
        .path("/")
        .max_age(cookie::time::Duration::days(state.config.auth_session_ttl_days));
    if let Some(domain) = state.config.session_cookie_domain.clone() {
        builder = builder.domain(domain);
    }
    builder.build()
}

fn clear_session_cookie(state: &AppState) -> Cookie<'static> {
    let mut builder = Cookie::build((state.config.session_cookie_name.clone(), ""))
        .http_only(true)
        .secure(state.config.session_cookie_secure)
        .path("/")
        .max_age(cookie::time::Duration::ZERO);
    if let Some(domain) = state.config.session_cookie_domain.clone() {
        builder = builder.domain(domain);
    }
    builder.build()
}

async fn start_session(state: &AppState, principal_id: &str) -> ApiResult<Cookie<'static>> {
    let token = new_session_token();
    let token_hash = hash_session_token(&state.config.auth_secret_key, &token);
    segforge_db::sessions::create(
        &state.pool,
        principal_id,
        &token_hash,
        chrono::Duration::days(state.config.auth_session_ttl_days),
    )
    .await?;
    Ok(build_session_cookie(state, token))
}

fn random_six_digit_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// `POST /api/auth/request_code`: generate, hash, and persist a one-time
/// code. Actual delivery (SMTP) is out of scope per SPEC_FULL.md §1 — in
/// debug deployments the code is also logged when `AUTH_DEV_PRINT_CODE=1`.
pub async fn request_code(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequestCodeIn>,
) -> ApiResult<Json<AuthOkOut>> {
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    check_allowlist(&state, &email)?;
    enforce_hourly(&state.pool, "otp_request", &email, "AUTH_RL_OTP_REQUEST_PER_EMAIL_PER_HOUR", 10).await?;

    if let Some(recent) = segforge_db::otp::most_recent_active(&state.pool, &email).await? {
        let created_at = chrono::DateTime::parse_from_rfc3339(&recent.created_at)
            .map(|d| d.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());
        let elapsed = (chrono::Utc::now() - created_at).num_seconds();
        if elapsed < state.config.auth_otp_min_interval_seconds {
            return Err(ApiError::RateLimited("OTP_TOO_FREQUENT".to_string()));
        }
    }

    let code = random_six_digit_code();
    let code_hash = hash_otp(&state.config.auth_secret_key, &email, &code);
    segforge_db::otp::create(
        &state.pool,
        &email,
        &code_hash,
        chrono::Duration::minutes(state.config.auth_otp_ttl_minutes),
    )
    .await?;

    if state.config.auth_dev_print_code {
        tracing::info!(%email, %code, "dev: generated OTP code (AUTH_DEV_PRINT_CODE=1)");
    }

    Ok(Json(AuthOkOut::default()))
}

/// `POST /api/auth/verify_code`: constant-time scan of unexpired, unconsumed
/// codes for `email`; on a match, consumes the row and issues a session.
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<AuthVerifyCodeIn>,
) -> ApiResult<(CookieJar, Json<AuthMeOut>)> {
    let email = normalize_email(&payload.email);
    let candidate_hash = hash_otp(&state.config.auth_secret_key, &email, payload.code.trim());

    let candidates = segforge_db::otp::active_candidates(&state.pool, &email).await?;
    let matched = candidates.iter().find(|row| otp_hash_eq(&row.code_hash, &candidate_hash));

    if let Some(row) = matched {
        segforge_db::otp::consume(&state.pool, &row.id).await?;
        let cookie = start_session(&state, &email).await?;
        let jar = jar.add(cookie);
        return Ok((jar, Json(AuthMeOut { authenticated: true, email: Some(email) })));
    }

    if let Some(row) = candidates.first() {
        let attempts = segforge_db::otp::increment_attempts(&state.pool, &row.id).await?;
        if attempts >= state.config.auth_otp_max_verify_attempts {
            segforge_db::otp::consume(&state.pool, &row.id).await?;
        }
    }
    Err(ApiError::bad_request("CODE_INVALID"))
}

/// `POST /api/auth/register`: password+invite variant. Invite redemption is
/// a single conditional `UPDATE` so concurrent redemptions of the same code
/// can only ever succeed once (SPEC_FULL.md §8).
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterIn>,
) -> ApiResult<(CookieJar, Json<RegisterOut>)> {
    let email = normalize_email(&payload.email);
    validate_email(&email)?;

    let username = payload
        .username
        .clone()
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());
    if username.len() < 3 || username.len() > 32 || !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ApiError::bad_request("USERNAME_INVALID"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("PASSWORD_TOO_WEAK"));
    }
    let country = payload.country.trim();
    if country.is_empty() || country.len() > 56 {
        return Err(ApiError::bad_request("COUNTRY_INVALID"));
    }
    if !REFERRAL_ALLOWLIST.contains(&payload.referral.as_str()) {
        return Err(ApiError::bad_request("REFERRAL_INVALID"));
    }

    enforce_hourly(&state.pool, "register", &email, "AUTH_RL_REGISTER_PER_EMAIL_PER_HOUR", 3).await?;

    let code = normalize_invite_code(&payload.invite_code);
    let invite = segforge_db::invites::find(&state.pool, &code)
        .await?
        .ok_or_else(|| ApiError::bad_request("INVITE_INVALID"))?;
    if invite.disabled_at.is_some() {
        return Err(ApiError::bad_request("INVITE_DISABLED"));
    }
    if invite.redeemed_by.is_some() {
        return Err(ApiError::bad_request("INVITE_USED"));
    }

    let principal_id = uuid::Uuid::new_v4().to_string();
    if !segforge_db::invites::try_redeem(&state.pool, &code, &principal_id).await? {
        return Err(ApiError::bad_request("INVITE_USED"));
    }

    let password_hash = hash_password(&payload.password);
    segforge_db::credentials::create(&state.pool, &principal_id, &username, &password_hash)
        .await
        .map_err(|e| match e {
            segforge_db::DbError::Conflict(_) => ApiError::bad_request("USERNAME_INVALID"),
            other => other.into(),
        })?;

    let mut invites = Vec::with_capacity(state.config.invite_children_per_redeem as usize);
    for _ in 0..state.config.invite_children_per_redeem {
        let child = new_invite_code(&state.config.invite_code_prefix);
        segforge_db::invites::create(&state.pool, &child, Some(&code), Some(&principal_id)).await?;
        invites.push(child);
    }

    let cookie = start_session(&state, &principal_id).await?;
    let jar = jar.add(cookie);
    Ok((
        jar,
        Json(RegisterOut { authenticated: true, user_id: principal_id, username, email, invites }),
    ))
}

/// `POST /api/auth/login`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginIn>,
) -> ApiResult<(CookieJar, Json<AuthMeOut>)> {
    let row = segforge_db::credentials::find_by_username(&state.pool, payload.username.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("INVALID_CREDENTIALS".to_string()))?;
    if !verify_password(&payload.password, &row.password_hash) {
        return Err(ApiError::Unauthorized("INVALID_CREDENTIALS".to_string()));
    }

    let cookie = start_session(&state, &row.principal_id).await?;
    let jar = jar.add(cookie);
    Ok((jar, Json(AuthMeOut { authenticated: true, email: Some(row.username) })))
}

/// `GET /api/auth/me`.
pub async fn me(OptionalAuthUser(user): OptionalAuthUser) -> Json<AuthMeOut> {
    match user {
        Some(u) => Json(AuthMeOut { authenticated: true, email: u.email.or(Some(u.principal_id)) }),
        None => Json(AuthMeOut { authenticated: false, email: None }),
    }
}

/// `POST /api/auth/logout`: revoke the session row (if any) and clear the
/// cookie. After this, requests with the previous cookie are unauthenticated
/// (SPEC_FULL.md §8).
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<(CookieJar, Json<AuthOkOut>)> {
    if let Some(cookie) = jar.get(&state.config.session_cookie_name) {
        let token_hash = hash_session_token(&state.config.auth_secret_key, cookie.value());
        segforge_db::sessions::revoke(&state.pool, &token_hash).await?;
    }
    let jar = jar.add(clear_session_cookie(&state));
    Ok((jar, Json(AuthOkOut::default())))
}

/// `GET /api/auth/invites`: the caller's own unredeemed, undisabled codes.
pub async fn list_invites(
    State(state): State<AppState>,
    crate::auth::WriteUser(user): crate::auth::WriteUser,
) -> ApiResult<Json<Vec<String>>> {
    if user.is_anonymous() {
        return Err(ApiError::AuthRequired);
    }
    let rows = segforge_db::invites::list_unredeemed_for_owner(&state.pool, &user.principal_id).await?;
    Ok(Json(rows.into_iter().map(|r| r.code).collect()))
}
