use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use shared::types::server_config::{AuthConfig, BootstrapAdminConfig, FallbackAdminConfig};
use shared::types::{
    AdminProfile, AdminRecord, AdminRole, AdminUpdate, ChangePasswordRequest, CreateAdminRequest,
    NewAdmin, TokenPair, UpdateAdminRequest, UpdateProfileRequest,
};

use crate::auth::errors::AuthError;
use crate::auth::identity::{Authentication, Identity};
use crate::auth::tokens::TokenIssuer;
use crate::database::AdminStore;
use crate::database::utils::{
    hash_password, is_strong_password, is_valid_email, normalize_email, sanitize_string,
    verify_password,
};

/// Id carried by tokens minted for the fallback admin.
pub const FALLBACK_ADMIN_ID: &str = "00000000-0000-4000-8000-000000000000";

const MAX_NAME_LEN: usize = 100;

/// Hashed once per service and checked when a login names no known admin,
/// so unknown and known emails cost the same Argon2 work.
const TIMING_DUMMY_PASSWORD: &str = "chapel-timing-equaliser-0";

// ---------------------------------------------------------------------------
// Fallback admin
// ---------------------------------------------------------------------------

/// Credential pair accepted at login only while the identity store is down.
#[derive(Clone)]
pub struct FallbackAdmin {
    identity: Identity,
    password_hash: String,
}

impl fmt::Debug for FallbackAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackAdmin")
            .field("email", &self.identity.email)
            .field("role", &self.identity.role)
            .finish_non_exhaustive()
    }
}

impl FallbackAdmin {
    pub fn from_config(config: &FallbackAdminConfig) -> anyhow::Result<Self> {
        let password_hash =
            hash_password(&config.password).context("Failed to hash fallback admin password")?;

        Ok(Self {
            identity: Identity {
                id: FALLBACK_ADMIN_ID.to_string(),
                email: normalize_email(&config.email),
                name: config.name.clone(),
                role: config.role,
                permissions: config.role.default_permissions(),
            },
            password_hash,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn matches(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        if self.identity.email != email {
            return Ok(false);
        }
        verify_password(&self.password_hash, password).map_err(|e| AuthError::Internal(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub admin: AdminProfile,
    pub tokens: TokenPair,
    /// Issued against the fallback admin while the store was unreachable.
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub expires_in: u64,
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

/// Session and admin-account operations over an injected [`AdminStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AdminStore>,
    tokens: TokenIssuer,
    fallback: Option<FallbackAdmin>,
    dummy_hash: String,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AdminStore>,
        tokens: TokenIssuer,
        fallback: Option<FallbackAdmin>,
    ) -> anyhow::Result<Self> {
        let dummy_hash =
            hash_password(TIMING_DUMMY_PASSWORD).context("Failed to prepare login hash")?;

        Ok(Self {
            store,
            tokens,
            fallback,
            dummy_hash,
        })
    }

    pub fn from_config(store: Arc<dyn AdminStore>, config: &AuthConfig) -> anyhow::Result<Self> {
        let fallback = config
            .fallback_admin
            .as_ref()
            .map(FallbackAdmin::from_config)
            .transpose()?;

        if let Some(fallback) = &fallback {
            warn!(
                "Fallback admin {} is enabled; it can log in while the identity store is down",
                fallback.identity.email
            );
        }

        Self::new(store, TokenIssuer::from_config(config), fallback)
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        info!("Login attempt for {}", email);

        let record = match self.store.find_by_email(&email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.burn_verify(password);
                warn!("Login failed: no admin {}", email);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) if e.is_unavailable() => {
                warn!("Identity store unavailable during login: {}", e);
                return self.fallback_login(&email, password);
            }
            Err(e) => return Err(e.into()),
        };

        let password_ok = verify_password(&record.password_hash, password).map_err(|e| {
            error!("Stored hash for admin {} is unusable: {}", record.id, e);
            AuthError::Internal(e.to_string())
        })?;

        if !password_ok {
            warn!("Login failed: wrong password for {}", email);
            self.note_login(&record, false).await;
            return Err(AuthError::InvalidCredentials);
        }

        if !record.is_active {
            warn!("Login refused: account {} is disabled", email);
            return Err(AuthError::AccountDisabled);
        }

        self.note_login(&record, true).await;

        let tokens = self.tokens.issue(&Identity::from_record(&record))?;
        info!("Admin {} logged in ({})", record.id, record.role);

        Ok(LoginOutcome {
            admin: record.profile(),
            tokens,
            degraded: false,
        })
    }

    fn fallback_login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(fallback) = &self.fallback else {
            return Err(AuthError::StoreUnavailable);
        };

        if !fallback.matches(email, password)? {
            warn!("Degraded login refused for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        warn!(
            "Issuing degraded session for fallback admin {}",
            fallback.identity.email
        );

        Ok(LoginOutcome {
            admin: fallback.identity.synthetic_profile(),
            tokens: self.tokens.issue(&fallback.identity)?,
            degraded: true,
        })
    }

    /// Same Argon2 cost as a real check. The outcome is discarded.
    fn burn_verify(&self, password: &str) {
        if let Err(e) = verify_password(&self.dummy_hash, password) {
            error!("Timing hash is unusable: {}", e);
        }
    }

    /// Counter bookkeeping never fails a login.
    async fn note_login(&self, record: &AdminRecord, succeeded: bool) {
        if let Err(e) = self.store.record_login(&record.id, succeeded).await {
            warn!("Failed to record login for admin {}: {}", record.id, e);
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError> {
        let admin_id = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            warn!("Refresh rejected: {}", e);
            AuthError::RefreshInvalid
        })?;

        let (identity, degraded) = match self.store.find_by_id(&admin_id).await {
            Ok(Some(record)) if record.is_active => (Identity::from_record(&record), false),
            Ok(Some(_)) => return Err(AuthError::AccountDisabled),
            Ok(None) => return Err(AuthError::AdminNotFound),
            Err(e) if e.is_unavailable() => match &self.fallback {
                Some(fallback) if fallback.identity.id == admin_id => {
                    warn!("Identity store unavailable; refreshing fallback admin session");
                    (fallback.identity.clone(), true)
                }
                _ => {
                    warn!("Identity store unavailable; cannot refresh admin {}", admin_id);
                    return Err(AuthError::StoreUnavailable);
                }
            },
            Err(e) => return Err(e.into()),
        };

        Ok(RefreshOutcome {
            access_token: self.tokens.issue_access(&identity)?,
            expires_in: self.tokens.access_ttl_secs(),
            degraded,
        })
    }

    /// Resolve the caller behind a bearer token.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Authentication, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let claims = self.tokens.verify_access(token)?;

        match self.store.find_by_id(&claims.sub).await {
            Ok(Some(record)) if record.is_active => {
                Ok(Authentication::Verified(Identity::from_record(&record)))
            }
            Ok(Some(_)) => Err(AuthError::AccountDisabled),
            Ok(None) => Err(AuthError::AdminNotFound),
            Err(e) if e.is_unavailable() => {
                warn!(
                    "Identity store unavailable; trusting token claims for admin {} ({})",
                    claims.sub, e
                );
                Ok(Authentication::Degraded(Identity::from_claims(&claims)))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── Own account ───────────────────────────────────────────────────────────

    pub async fn profile_for(&self, auth: &Authentication) -> Result<AdminProfile, AuthError> {
        match auth {
            Authentication::Degraded(identity) => Ok(identity.synthetic_profile()),
            Authentication::Verified(identity) => self
                .store
                .find_by_id(&identity.id)
                .await?
                .map(|record| record.profile())
                .ok_or(AuthError::AdminNotFound),
        }
    }

    pub async fn update_profile(
        &self,
        identity: &Identity,
        request: UpdateProfileRequest,
    ) -> Result<AdminProfile, AuthError> {
        let update = AdminUpdate {
            name: request.name.as_deref().map(validate_name).transpose()?,
            email: request.email.as_deref().map(validate_email).transpose()?,
            ..Default::default()
        };

        let record = self
            .store
            .update(&identity.id, update)
            .await?
            .ok_or(AuthError::AdminNotFound)?;

        info!("Admin {} updated their profile", record.id);
        Ok(record.profile())
    }

    pub async fn change_password(
        &self,
        identity: &Identity,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let record = self
            .store
            .find_by_id(&identity.id)
            .await?
            .ok_or(AuthError::AdminNotFound)?;

        let current_ok = verify_password(&record.password_hash, &request.current_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !current_ok {
            warn!("Password change for admin {} rejected: wrong current password", record.id);
            return Err(AuthError::WrongPassword);
        }

        if request.new_password == request.current_password {
            return Err(AuthError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }
        check_password_strength(&request.new_password)?;

        let password_hash =
            hash_password(&request.new_password).map_err(|e| AuthError::Internal(e.to_string()))?;

        self.store
            .update(
                &record.id,
                AdminUpdate {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AuthError::AdminNotFound)?;

        info!("Admin {} changed their password", record.id);
        Ok(())
    }

    // ── Admin management ──────────────────────────────────────────────────────

    pub async fn create_admin(&self, request: CreateAdminRequest) -> Result<AdminProfile, AuthError> {
        let email = validate_email(&request.email)?;
        let name = validate_name(&request.name)?;
        check_password_strength(&request.password)?;

        let password_hash =
            hash_password(&request.password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let record = self
            .store
            .create(NewAdmin {
                email,
                password_hash,
                name,
                role: request.role,
                permissions: request
                    .permissions
                    .unwrap_or_else(|| request.role.default_permissions()),
            })
            .await?;

        info!("Created admin {} ({})", record.id, record.role);
        Ok(record.profile())
    }

    pub async fn get_admin(&self, id: &str) -> Result<AdminProfile, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .map(|record| record.profile())
            .ok_or(AuthError::NoSuchAdmin)
    }

    /// A super admin may not lock themselves out.
    pub async fn update_admin(
        &self,
        actor: &Identity,
        id: &str,
        request: UpdateAdminRequest,
    ) -> Result<AdminProfile, AuthError> {
        if actor.id == id {
            if request.is_active == Some(false) {
                return Err(AuthError::Validation(
                    "You cannot deactivate your own account".to_string(),
                ));
            }
            if request.role.is_some_and(|role| role != AdminRole::SuperAdmin) {
                return Err(AuthError::Validation(
                    "You cannot remove your own super admin role".to_string(),
                ));
            }
        }

        let update = AdminUpdate {
            name: request.name.as_deref().map(validate_name).transpose()?,
            role: request.role,
            // A role change without an explicit list resets to that role's set.
            permissions: request
                .permissions
                .or_else(|| request.role.map(|role| role.default_permissions())),
            is_active: request.is_active,
            ..Default::default()
        };

        let record = self
            .store
            .update(id, update)
            .await?
            .ok_or(AuthError::NoSuchAdmin)?;

        info!("Admin {} updated admin {}: {}", actor.id, record.id, record);
        Ok(record.profile())
    }

    /// Create the configured super admin when the store holds no admins.
    pub async fn bootstrap(
        &self,
        config: Option<&BootstrapAdminConfig>,
    ) -> Result<Option<AdminProfile>, AuthError> {
        let Some(config) = config else {
            return Ok(None);
        };

        if self.store.count().await? > 0 {
            return Ok(None);
        }

        let profile = self
            .create_admin(CreateAdminRequest {
                email: config.email.clone(),
                password: config.password.clone(),
                name: config.name.clone(),
                role: AdminRole::SuperAdmin,
                permissions: None,
            })
            .await?;

        info!("Bootstrapped super admin {}", profile.email);
        Ok(Some(profile))
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = sanitize_string(name);
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AuthError::Validation(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

fn check_password_strength(password: &str) -> Result<(), AuthError> {
    if !is_strong_password(password) {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters and contain a letter and a number".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert_eq!(validate_name("  Pastor John ").unwrap(), "Pastor John");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn email_is_normalized_before_validation() {
        assert_eq!(validate_email(" Admin@Chapel.ORG ").unwrap(), "admin@chapel.org");
        assert!(matches!(
            validate_email("nope"),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn fallback_matches_only_its_own_pair() {
        let fallback = FallbackAdmin::from_config(&FallbackAdminConfig {
            email: "Dev@Chapel.org".into(),
            password: "dev-password-1".into(),
            name: "Development Admin".into(),
            role: AdminRole::SuperAdmin,
        })
        .unwrap();

        assert_eq!(fallback.identity().id, FALLBACK_ADMIN_ID);
        assert!(fallback.matches("dev@chapel.org", "dev-password-1").unwrap());
        assert!(!fallback.matches("dev@chapel.org", "wrong").unwrap());
        assert!(!fallback.matches("other@chapel.org", "dev-password-1").unwrap());
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_hash_check() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = crate::database::SqliteAdminStore::from_pool(pool);
        store.migrate().await.unwrap();
        let service = AuthService::from_config(Arc::new(store), &AuthConfig::default()).unwrap();

        assert!(service.dummy_hash.starts_with("$argon2"));
        assert!(!verify_password(&service.dummy_hash, "any-password-1").unwrap());
        assert!(matches!(
            service.login("ghost@chapel.org", "any-password-1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
