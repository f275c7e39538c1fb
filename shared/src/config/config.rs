use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::types::server_config::{
    AppConfig, ConfigError, DEV_ACCESS_SECRET, DEV_REFRESH_SECRET, WindowLimit,
};

const MIN_SECRET_LEN: usize = 32;
const MAX_ACCESS_TTL_MINUTES: u64 = 24 * 60;
const MAX_REFRESH_TTL_DAYS: u64 = 365;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path.display());

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.max_body_bytes == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_body_bytes must be greater than 0".into(),
        ));
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::InvalidConfig(
            "database.max_connections must be greater than 0".into(),
        ));
    }

    let auth = &config.auth;

    if auth.access_token_ttl_minutes == 0 || auth.refresh_token_ttl_days == 0 {
        return Err(ConfigError::InvalidConfig(
            "token lifetimes must be greater than 0".into(),
        ));
    }

    if auth.access_token_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "access_token_ttl_minutes must be at most {}",
            MAX_ACCESS_TTL_MINUTES
        )));
    }

    if auth.refresh_token_ttl_days > MAX_REFRESH_TTL_DAYS {
        return Err(ConfigError::InvalidConfig(format!(
            "refresh_token_ttl_days must be at most {}",
            MAX_REFRESH_TTL_DAYS
        )));
    }

    if auth.refresh_token_ttl_secs() <= auth.access_token_ttl_secs() {
        return Err(ConfigError::InvalidConfig(
            "refresh tokens must outlive access tokens".into(),
        ));
    }

    let access = auth.resolved_access_secret();
    let refresh = auth.resolved_refresh_secret();

    if access.len() < MIN_SECRET_LEN || refresh.len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidConfig(format!(
            "token secrets must be at least {} characters long",
            MIN_SECRET_LEN
        )));
    }

    if access == refresh {
        return Err(ConfigError::InvalidConfig(
            "access and refresh token secrets must differ".into(),
        ));
    }

    let using_defaults = access == DEV_ACCESS_SECRET || refresh == DEV_REFRESH_SECRET;

    if config.server.is_production() {
        if using_defaults {
            return Err(ConfigError::InvalidConfig(
                "development token secrets cannot be used in production".into(),
            ));
        }
        if auth.fallback_admin.is_some() {
            return Err(ConfigError::InvalidConfig(
                "auth.fallback_admin is a development aid and is not allowed in production"
                    .into(),
            ));
        }
    } else if using_defaults {
        warn!("Using insecure development token secrets; set JWT_SECRET and JWT_REFRESH_SECRET");
    }

    if config.cors.allowed_origins.iter().any(|o| o.trim() == "*") {
        return Err(ConfigError::InvalidConfig(
            "cors.allowed_origins cannot contain \"*\": wildcard origins are incompatible with credentialed requests".into(),
        ));
    }

    let limits = &config.rate_limit;
    for (name, limit) in [
        ("general", limits.general),
        ("auth", limits.auth),
        ("upload", limits.upload),
        ("analytics", limits.analytics),
    ] {
        validate_window(name, limit)?;
    }

    if limits.admin.authenticated_max == 0
        || limits.admin.anonymous_max == 0
        || limits.admin.window_secs == 0
    {
        return Err(ConfigError::InvalidConfig(
            "rate_limit.admin ceilings and window must be greater than 0".into(),
        ));
    }

    Ok(())
}

fn validate_window(name: &str, limit: WindowLimit) -> Result<(), ConfigError> {
    if limit.max_requests == 0 || limit.window_secs == 0 {
        return Err(ConfigError::InvalidConfig(format!(
            "rate_limit.{} max_requests and window_secs must be greater than 0",
            name
        )));
    }
    Ok(())
}
