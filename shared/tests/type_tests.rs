/// Integration-level tests for the `shared` crate.
///
/// Each section tests one module; unit tests that are tightly coupled to
/// private helpers live inside the modules themselves (see `#[cfg(test)]`
/// blocks in `role.rs` and `server_config.rs`).
// ---------------------------------------------------------------------------
// JWT claims
// ---------------------------------------------------------------------------
#[cfg(test)]
mod jwt_tests {
    use shared::types::*;

    fn sample_claims() -> AccessClaims {
        AccessClaims {
            sub: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            email: "pastor@chapel.org".to_string(),
            role: AdminRole::Editor,
            permissions: vec!["content:read".to_string(), "content:write".to_string()],
            iat: 1_700_000_000,
            exp: 1_700_000_900,
        }
    }

    #[test]
    fn access_claims_use_wire_role_names() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["role"], "EDITOR");
        assert_eq!(json["sub"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(json["exp"], 1_700_000_900u64);
    }

    #[test]
    fn refresh_claims_carry_only_subject_and_times() {
        let claims = RefreshClaims {
            sub: "abc".to_string(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"sub"));
    }

    #[test]
    fn unknown_role_in_claims_is_rejected() {
        let raw = r#"{"sub":"a","email":"a@b.c","role":"OWNER","permissions":[],"iat":1,"exp":2}"#;
        assert!(serde_json::from_str::<AccessClaims>(raw).is_err());
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------
#[cfg(test)]
mod wire_tests {
    use shared::types::*;

    fn record() -> AdminRecord {
        AdminRecord {
            id: "id-1".to_string(),
            email: "admin@chapel.org".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            name: "Admin".to_string(),
            role: AdminRole::Admin,
            permissions: AdminRole::Admin.default_permissions(),
            is_active: true,
            login_count: 3,
            failed_login_count: 1,
            last_login_at: Some(1_700_000_000),
            created_at: 1_600_000_000,
            updated_at: 1_650_000_000,
        }
    }

    #[test]
    fn profile_never_exposes_password_hash() {
        let json = serde_json::to_string(&record().profile()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("failedLoginCount"));
        assert!(json.contains("\"isActive\":true"));
        assert!(json.contains("\"lastLoginAt\":1700000000"));
    }

    #[test]
    fn login_response_is_camel_case() {
        let response = LoginResponse::success(
            record().profile(),
            TokenPair {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_in: 900,
                refresh_expires_in: 604_800,
            },
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["expiresIn"], 900);
        assert!(json.get("refreshExpiresIn").is_none());
    }

    #[test]
    fn login_data_accepts_username_alias() {
        let data: LoginData =
            serde_json::from_str(r#"{"username":"a@chapel.org","password":"pw"}"#).unwrap();
        assert_eq!(data.email, "a@chapel.org");
    }

    #[test]
    fn create_admin_request_permissions_are_optional() {
        let request: CreateAdminRequest = serde_json::from_str(
            r#"{"email":"e@chapel.org","password":"pass-word-1","name":"E","role":"VIEWER"}"#,
        )
        .unwrap();
        assert_eq!(request.role, AdminRole::Viewer);
        assert!(request.permissions.is_none());
    }

    #[test]
    fn update_admin_request_fields_default_to_none() {
        let request: UpdateAdminRequest = serde_json::from_str(r#"{"isActive":false}"#).unwrap();
        assert_eq!(request.is_active, Some(false));
        assert!(request.role.is_none());
        assert!(request.name.is_none());
    }

    #[test]
    fn error_response_omits_empty_details() {
        let plain = serde_json::to_value(ErrorResponse::new("NO_TOKEN", "Access token required"))
            .unwrap();
        assert!(plain.get("details").is_none());

        let detailed = ErrorResponse::new("INSUFFICIENT_ROLE", "Forbidden")
            .with_details(serde_json::json!({ "current": "VIEWER" }));
        let json = serde_json::to_value(detailed).unwrap();
        assert_eq!(json["details"]["current"], "VIEWER");
    }

    #[test]
    fn admin_update_emptiness() {
        assert!(AdminUpdate::default().is_empty());
        let update = AdminUpdate {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------
#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use shared::config::{load_config, validate_config};
    use shared::types::AdminRole;
    use shared::types::server_config::{AppConfig, ConfigError, Environment};

    const ACCESS: &str = "config-test-access-secret-0123456789abcdef";
    const REFRESH: &str = "config-test-refresh-secret-0123456789abcdef";

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn production() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.environment = Environment::Production;
        config.auth.access_token_secret = Some(ACCESS.to_string());
        config.auth.refresh_token_secret = Some(REFRESH.to_string());
        config
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let file = write_config(
            r#"
[server]
port = 8080
trusted_proxies = ["10.0.0.0/8"]

[auth]
access_token_secret = "config-test-access-secret-0123456789abcdef"
refresh_token_secret = "config-test-refresh-secret-0123456789abcdef"

[auth.fallback_admin]
email = "dev@chapel.local"
password = "dev-fallback-pass1"

[rate_limit.auth]
max_requests = 10
window_secs = 600
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.trusted_proxies, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(config.rate_limit.auth.max_requests, 10);
        assert_eq!(config.rate_limit.general.max_requests, 100);
        assert_eq!(config.auth.access_token_ttl_minutes, 15);

        let fallback = config.auth.fallback_admin.unwrap();
        assert_eq!(fallback.role, AdminRole::SuperAdmin);
        assert_eq!(fallback.name, "Development Admin");
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = write_config("   \n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_config("[server\nport = 1");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("/definitely/not/here.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn development_defaults_validate() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn production_requires_real_secrets() {
        assert!(validate_config(&production()).is_ok());

        let mut config = production();
        config.auth.access_token_secret = None;
        config.auth.refresh_token_secret = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn production_forbids_fallback_admin() {
        let mut config = production();
        config.auth.fallback_admin = Some(shared::types::server_config::FallbackAdminConfig {
            email: "dev@chapel.local".into(),
            password: "dev-fallback-pass1".into(),
            name: "Dev".into(),
            role: AdminRole::SuperAdmin,
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn secrets_must_be_long_and_distinct() {
        let mut config = production();
        config.auth.access_token_secret = Some("short".into());
        assert!(validate_config(&config).is_err());

        let mut config = production();
        config.auth.refresh_token_secret = Some(ACCESS.to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_windows_are_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.upload.window_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.rate_limit.admin.anonymous_max = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn refresh_must_outlive_access() {
        let mut config = AppConfig::default();
        config.auth.access_token_ttl_minutes = 60 * 24;
        config.auth.refresh_token_ttl_days = 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn oversized_lifetimes_are_rejected_not_overflowed() {
        let mut config = AppConfig::default();
        config.auth.refresh_token_ttl_days = u64::MAX / 1000;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidConfig(_))
        ));

        let mut config = AppConfig::default();
        config.auth.access_token_ttl_minutes = u64::MAX;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidConfig(_))
        ));

        let file = write_config("[auth]\nrefresh_token_ttl_days = 18446744073709551\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn wildcard_cors_origin_is_rejected() {
        let mut config = AppConfig::default();
        config.cors.allowed_origins = vec!["https://admin.chapel.org".into(), "*".into()];
        match validate_config(&config) {
            Err(ConfigError::InvalidConfig(reason)) => assert!(reason.contains("wildcard")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        config.cors.allowed_origins = vec!["https://admin.chapel.org".into()];
        assert!(validate_config(&config).is_ok());
    }
}
