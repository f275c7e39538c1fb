use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

use shared::types::{AdminRole, ErrorResponse};

use crate::auth::tokens::TokenError;
use crate::database::StoreError;

// ---------------------------------------------------------------------------
// Authentication errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Invalid access token")]
    TokenInvalid,

    #[error("Invalid or expired refresh token")]
    RefreshInvalid,

    /// The token is valid but its subject no longer exists.
    #[error("Admin not found")]
    AdminNotFound,

    /// Lookup by id on an admin-management route found nothing.
    #[error("No admin with this id")]
    NoSuchAdmin,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("An admin with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Identity store is unavailable")]
    StoreUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::MissingToken => "NO_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "INVALID_TOKEN",
            Self::RefreshInvalid => "INVALID_REFRESH_TOKEN",
            Self::AdminNotFound => "ADMIN_NOT_FOUND",
            Self::NoSuchAdmin => "NOT_FOUND",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::WrongPassword => "INVALID_CURRENT_PASSWORD",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StoreUnavailable => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::RefreshInvalid
            | Self::AdminNotFound
            | Self::AccountDisabled
            | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::WrongPassword | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NoSuchAdmin => StatusCode::NOT_FOUND,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            // Never echo backend detail to clients.
            Self::Internal(_) => ErrorResponse::new(self.to_code(), "An internal error occurred"),
            _ => ErrorResponse::new(self.to_code(), &self.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) => Self::StoreUnavailable,
            StoreError::Conflict => Self::EmailTaken,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid(_) => Self::TokenInvalid,
            TokenError::Signing(msg) => Self::Internal(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient role")]
    InsufficientRole {
        required: Vec<AdminRole>,
        current: AdminRole,
    },

    #[error("Insufficient permissions")]
    MissingPermissions {
        required: Vec<String>,
        missing: Vec<String>,
    },
}

impl GuardError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            Self::MissingPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole { .. } | Self::MissingPermissions { .. } => {
                StatusCode::FORBIDDEN
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.to_code(), &self.to_string());
        match self {
            Self::Unauthorized => response,
            Self::InsufficientRole { required, current } => response.with_details(json!({
                "required": required,
                "current": current,
            })),
            Self::MissingPermissions { required, missing } => response.with_details(json!({
                "required": required,
                "missing": missing,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_auth_errors() {
        assert!(matches!(
            AuthError::from(StoreError::Unavailable("down".into())),
            AuthError::StoreUnavailable
        ));
        assert!(matches!(
            AuthError::from(StoreError::Conflict),
            AuthError::EmailTaken
        ));
        assert_eq!(
            AuthError::from(StoreError::Backend("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_hidden() {
        let body = AuthError::Internal("sqlite exploded".into()).to_response();
        assert!(!body.message.contains("sqlite"));
    }

    #[test]
    fn role_error_carries_required_and_current() {
        let err = GuardError::InsufficientRole {
            required: vec![AdminRole::SuperAdmin],
            current: AdminRole::Editor,
        };
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let details = err.to_response().details.unwrap();
        assert_eq!(details["required"], json!(["SUPER_ADMIN"]));
        assert_eq!(details["current"], json!("EDITOR"));
    }
}
