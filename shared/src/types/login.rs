use serde::{Deserialize, Serialize};

use crate::types::admin::AdminProfile;
use crate::types::jwt::TokenPair;

// ---------------------------------------------------------------------------
// Login wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Successful login envelope. Failures use [`crate::types::ErrorResponse`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status: String,
    pub message: String,
    pub admin: AdminProfile,
    pub access_token: String,
    /// Also set as the `refreshToken` cookie.
    pub refresh_token: String,
    pub expires_in: u64,
}

impl LoginResponse {
    pub fn success(admin: AdminProfile, tokens: TokenPair) -> Self {
        Self {
            status: "success".to_string(),
            message: "Login successful".to_string(),
            admin,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }
    }
}

// ---------------------------------------------------------------------------
// Refresh wire types
// ---------------------------------------------------------------------------

/// Body fallback for clients that cannot send the http-only cookie.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub status: String,
    pub access_token: String,
    pub expires_in: u64,
}

impl RefreshResponse {
    pub fn success(access_token: String, expires_in: u64) -> Self {
        Self {
            status: "success".to_string(),
            access_token,
            expires_in,
        }
    }
}
