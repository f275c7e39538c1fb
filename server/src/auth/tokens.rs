use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;

use shared::types::server_config::AuthConfig;
use shared::types::{AccessClaims, RefreshClaims, TokenPair};

use crate::auth::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Mints and verifies HS256 access and refresh tokens.
///
/// Access and refresh tokens are signed with different secrets, so one can
/// never be replayed as the other.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    validation: Validation,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl TokenIssuer {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
            validation,
        }
    }

    /// Build from config, letting `JWT_SECRET` / `JWT_REFRESH_SECRET` win.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.resolved_access_secret(),
            &config.resolved_refresh_secret(),
            config.access_token_ttl_secs(),
            config.refresh_token_ttl_secs(),
        )
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        self.issue_at(identity, now_secs())
    }

    /// Mint a pair as if the clock read `issued_at`.
    pub fn issue_at(&self, identity: &Identity, issued_at: u64) -> Result<TokenPair, TokenError> {
        let access_token = self.sign_access(identity, issued_at)?;

        let refresh_claims = RefreshClaims {
            sub: identity.id.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.refresh_ttl_secs),
        };
        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &self.refresh_encoding,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!("Issued token pair for admin {}", identity.id);

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
            refresh_expires_in: self.refresh_ttl_secs,
        })
    }

    /// Access token only. Used by the refresh flow.
    pub fn issue_access(&self, identity: &Identity) -> Result<String, TokenError> {
        self.sign_access(identity, now_secs())
    }

    fn sign_access(&self, identity: &Identity, issued_at: u64) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            permissions: identity.permissions.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.access_ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Returns the admin id only. Expiry is reported as `Invalid`.
    pub fn verify_refresh(&self, token: &str) -> Result<String, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
