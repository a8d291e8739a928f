//! API process configuration, read from the environment.
//!
//! Grounded on `original_source/src/autosedance/config.py::Settings` (field
//! set and defaults) and the teacher's `ApiConfig::from_env` shape.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub projects_root: std::path::PathBuf,
    pub max_upload_mb: u64,
    pub disable_worker: bool,

    pub auth_enabled: bool,
    pub auth_require_for_reads: bool,
    pub auth_require_for_writes: bool,
    pub auth_secret_key: Option<String>,
    pub auth_session_ttl_days: i64,
    pub auth_otp_ttl_minutes: i64,
    pub auth_otp_min_interval_seconds: i64,
    pub auth_otp_max_verify_attempts: i64,
    pub auth_email_allowlist: Vec<String>,
    pub auth_dev_print_code: bool,

    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub session_cookie_samesite: String,
    pub session_cookie_domain: Option<String>,

    pub trust_proxy_headers: bool,
    pub trusted_proxy_ips: Vec<String>,

    pub invite_children_per_redeem: u32,
    pub invite_code_prefix: String,

    pub overload_max_inflight_requests: usize,
    pub overload_acquire_timeout_seconds: u64,
    pub overload_retry_after_seconds: u64,
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_num<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(v) => v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_num("PORT", 8080),
            cors_origins: env_csv("CORS_ORIGINS", &["*"]),
            database_url: env_string("DATABASE_URL", "sqlite://./output/segforge.sqlite3"),
            projects_root: std::path::PathBuf::from(env_string(
                "PROJECTS_DIR",
                &env_string("OUTPUT_DIR", "./output/projects"),
            )),
            max_upload_mb: env_num("MAX_UPLOAD_MB", 512),
            disable_worker: env_bool("DISABLE_WORKER", false),

            auth_enabled: env_bool("AUTH_ENABLED", false),
            auth_require_for_reads: env_bool("AUTH_REQUIRE_FOR_READS", false),
            auth_require_for_writes: env_bool("AUTH_REQUIRE_FOR_WRITES", false),
            auth_secret_key: std::env::var("AUTH_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            auth_session_ttl_days: env_num("AUTH_SESSION_TTL_DAYS", 30),
            auth_otp_ttl_minutes: env_num("AUTH_OTP_TTL_MINUTES", 10),
            auth_otp_min_interval_seconds: env_num("AUTH_OTP_MIN_INTERVAL_SECONDS", 60),
            auth_otp_max_verify_attempts: env_num("AUTH_OTP_MAX_VERIFY_ATTEMPTS", 5),
            auth_email_allowlist: env_csv("AUTH_EMAIL_ALLOWLIST", &[]),
            auth_dev_print_code: env_bool("AUTH_DEV_PRINT_CODE", false),

            session_cookie_name: env_string("SESSION_COOKIE_NAME", "segforge_session"),
            session_cookie_secure: env_bool("SESSION_COOKIE_SECURE", true),
            session_cookie_samesite: env_string("SESSION_COOKIE_SAMESITE", "lax"),
            session_cookie_domain: std::env::var("SESSION_COOKIE_DOMAIN").ok().filter(|s| !s.is_empty()),

            trust_proxy_headers: env_bool("TRUST_PROXY_HEADERS", false),
            trusted_proxy_ips: env_csv("TRUSTED_PROXY_IPS", &[]),

            invite_children_per_redeem: env_num("INVITE_CHILDREN_PER_REDEEM", 5),
            invite_code_prefix: env_string("INVITE_CODE_PREFIX", "sf-"),

            overload_max_inflight_requests: env_num("OVERLOAD_MAX_INFLIGHT_REQUESTS", 64),
            overload_acquire_timeout_seconds: env_num("OVERLOAD_ACQUIRE_TIMEOUT_SECONDS", 5),
            overload_retry_after_seconds: env_num("OVERLOAD_RETRY_AFTER_SECONDS", 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = ApiConfig::from_env();
        assert!(c.port > 0);
        assert!(c.overload_max_inflight_requests > 0);
        assert_eq!(c.session_cookie_name, "segforge_session");
    }
}
