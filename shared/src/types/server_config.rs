use serde::Deserialize;
use thiserror::Error;

use crate::types::role::AdminRole;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Insecure development defaults
//
// Used only when neither the env var nor the config field is set. Validation
// refuses to start a production server that still resolves to either value.
// ---------------------------------------------------------------------------

pub const DEV_ACCESS_SECRET: &str = "dev-access-token-secret-change-me-before-deploying";
pub const DEV_REFRESH_SECRET: &str = "dev-refresh-token-secret-change-me-before-deploying";

pub const ACCESS_SECRET_ENV: &str = "JWT_SECRET";
pub const REFRESH_SECRET_ENV: &str = "JWT_REFRESH_SECRET";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub environment: Environment,
    /// Request bodies larger than this are rejected with 413.
    pub max_body_bytes: usize,
    /// CIDR networks whose `X-Forwarded-For` / `X-Real-IP` headers are
    /// trusted when resolving the client IP for rate limiting.
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Credentials accepted by `/api/auth/login` when the identity store is
/// unreachable. Development only.
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackAdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_fallback_name")]
    pub name: String,
    #[serde(default = "default_fallback_role")]
    pub role: AdminRole,
}

/// Super admin created at startup when the identity store is empty.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_bootstrap_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for access tokens. `JWT_SECRET` takes priority.
    pub access_token_secret: Option<String>,
    /// HMAC key for refresh tokens. `JWT_REFRESH_SECRET` takes priority.
    pub refresh_token_secret: Option<String>,
    pub access_token_ttl_minutes: u64,
    pub refresh_token_ttl_days: u64,
    pub fallback_admin: Option<FallbackAdminConfig>,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AdminWindowLimit {
    /// Ceiling when the caller presents a valid access token (keyed by id).
    pub authenticated_max: u32,
    /// Ceiling for everyone else (keyed by IP).
    pub anonymous_max: u32,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub general: WindowLimit,
    pub auth: WindowLimit,
    pub admin: AdminWindowLimit,
    pub upload: WindowLimit,
    pub analytics: WindowLimit,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"0.0.0.0:5000"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl AuthConfig {
    /// Saturates instead of overflowing; `validate_config` rejects
    /// lifetimes anywhere near that range.
    pub fn access_token_ttl_secs(&self) -> u64 {
        self.access_token_ttl_minutes.saturating_mul(60)
    }

    pub fn refresh_token_ttl_secs(&self) -> u64 {
        self.refresh_token_ttl_days.saturating_mul(24 * 60 * 60)
    }

    /// Resolve the access-token secret: `JWT_SECRET` env var, then the config
    /// field, then the development default.
    pub fn resolved_access_secret(&self) -> String {
        resolve_secret(
            std::env::var(ACCESS_SECRET_ENV).ok(),
            self.access_token_secret.as_deref(),
            DEV_ACCESS_SECRET,
        )
    }

    /// Resolve the refresh-token secret: `JWT_REFRESH_SECRET` env var, then
    /// the config field, then the development default.
    pub fn resolved_refresh_secret(&self) -> String {
        resolve_secret(
            std::env::var(REFRESH_SECRET_ENV).ok(),
            self.refresh_token_secret.as_deref(),
            DEV_REFRESH_SECRET,
        )
    }
}

/// First non-empty value of `env`, `configured`, else `default`.
pub fn resolve_secret(env: Option<String>, configured: Option<&str>, default: &str) -> String {
    env.filter(|s| !s.is_empty())
        .or_else(|| configured.filter(|s| !s.is_empty()).map(str::to_string))
        .unwrap_or_else(|| default.to_string())
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
            environment: Environment::Development,
            max_body_bytes: 1024 * 1024,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chapel.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: None,
            refresh_token_secret: None,
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            fallback_admin: None,
            bootstrap_admin: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        const FIFTEEN_MINUTES: u64 = 15 * 60;
        Self {
            general: WindowLimit {
                max_requests: 100,
                window_secs: FIFTEEN_MINUTES,
            },
            auth: WindowLimit {
                max_requests: 5,
                window_secs: FIFTEEN_MINUTES,
            },
            admin: AdminWindowLimit {
                authenticated_max: 1000,
                anonymous_max: 100,
                window_secs: FIFTEEN_MINUTES,
            },
            upload: WindowLimit {
                max_requests: 50,
                window_secs: 60 * 60,
            },
            analytics: WindowLimit {
                max_requests: 300,
                window_secs: FIFTEEN_MINUTES,
            },
        }
    }
}

fn default_fallback_name() -> String {
    "Development Admin".to_string()
}

fn default_fallback_role() -> AdminRole {
    AdminRole::SuperAdmin
}

fn default_bootstrap_name() -> String {
    "Super Admin".to_string()
}
