use serde::{Deserialize, Serialize};

use crate::types::role::AdminRole;

/// Claims embedded in every access token.
///
/// Access tokens are stateless: nothing about them is stored server-side and
/// they stop working only when `exp` passes. The role and permission list
/// are a snapshot taken at issue time; the authentication middleware
/// re-reads the admin record on every request and only falls back to these
/// values when the identity store cannot be reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Admin id (matches `admins.id`).
    pub sub: String,

    pub email: String,

    pub role: AdminRole,

    pub permissions: Vec<String>,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: u64,

    /// Expiry (Unix timestamp, seconds).
    pub exp: u64,
}

/// Claims embedded in a refresh token.
///
/// Deliberately carries nothing but the admin id: role and permissions must
/// be re-fetched when a new access token is minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Freshly minted access + refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: u64,
}
