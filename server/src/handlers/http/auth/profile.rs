use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::warn;

use shared::types::{ChangePasswordRequest, UpdateProfileRequest};

use crate::AppState;
use crate::auth::Authentication;
use crate::handlers::http::utils::*;

/// GET /api/auth/me
pub async fn handle_me(
    _req: Request<Bytes>,
    state: AppState,
    auth: Authentication,
) -> Result<JsonResponse> {
    match state.auth.profile_for(&auth).await {
        Ok(profile) => deliver_success_json(Some(profile), StatusCode::OK),
        Err(e) => deliver_auth_error(&e),
    }
}

/// PUT /api/auth/profile
pub async fn handle_update_profile(
    req: Request<Bytes>,
    state: AppState,
    auth: Authentication,
) -> Result<JsonResponse> {
    let update: UpdateProfileRequest = match parse_json(req.body()) {
        Ok(update) => update,
        Err(reason) => {
            warn!("Profile update parsing failed: {}", reason);
            return deliver_error_json("VALIDATION_ERROR", &reason, StatusCode::BAD_REQUEST);
        }
    };

    match state.auth.update_profile(auth.identity(), update).await {
        Ok(profile) => deliver_success_json(Some(profile), StatusCode::OK),
        Err(e) => deliver_auth_error(&e),
    }
}

/// PUT /api/auth/password
pub async fn handle_change_password(
    req: Request<Bytes>,
    state: AppState,
    auth: Authentication,
) -> Result<JsonResponse> {
    let change: ChangePasswordRequest = match parse_json(req.body()) {
        Ok(change) => change,
        Err(reason) => {
            warn!("Password change parsing failed: {}", reason);
            return deliver_error_json("VALIDATION_ERROR", &reason, StatusCode::BAD_REQUEST);
        }
    };

    match state.auth.change_password(auth.identity(), change).await {
        Ok(()) => deliver_serialized_json(
            &serde_json::json!({
                "status": "success",
                "message": "Password changed successfully"
            }),
            StatusCode::OK,
        ),
        Err(e) => deliver_auth_error(&e),
    }
}
