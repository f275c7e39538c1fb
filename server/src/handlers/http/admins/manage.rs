use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::{info, warn};

use shared::types::{CreateAdminRequest, UpdateAdminRequest};

use crate::AppState;
use crate::auth::Authentication;
use crate::handlers::http::utils::*;

/// `:id` segment of `/api/admins/:id`.
fn admin_id(req: &Request<Bytes>) -> Option<&str> {
    req.uri()
        .path()
        .strip_prefix("/api/admins/")
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

fn bad_admin_id() -> Result<JsonResponse> {
    deliver_error_json("VALIDATION_ERROR", "Invalid admin id", StatusCode::BAD_REQUEST)
}

/// POST /api/admins
pub async fn handle_create_admin(
    req: Request<Bytes>,
    state: AppState,
    auth: Authentication,
) -> Result<JsonResponse> {
    let request: CreateAdminRequest = match parse_json(req.body()) {
        Ok(request) => request,
        Err(reason) => {
            warn!("Create admin parsing failed: {}", reason);
            return deliver_error_json("VALIDATION_ERROR", &reason, StatusCode::BAD_REQUEST);
        }
    };

    match state.auth.create_admin(request).await {
        Ok(profile) => {
            info!("Admin {} created admin {}", auth.identity().id, profile.id);
            deliver_success_json(Some(profile), StatusCode::CREATED)
        }
        Err(e) => deliver_auth_error(&e),
    }
}

/// GET /api/admins/:id
pub async fn handle_get_admin(
    req: Request<Bytes>,
    state: AppState,
    _auth: Authentication,
) -> Result<JsonResponse> {
    let Some(id) = admin_id(&req) else {
        return bad_admin_id();
    };

    match state.auth.get_admin(id).await {
        Ok(profile) => deliver_success_json(Some(profile), StatusCode::OK),
        Err(e) => deliver_auth_error(&e),
    }
}

/// PUT /api/admins/:id
pub async fn handle_update_admin(
    req: Request<Bytes>,
    state: AppState,
    auth: Authentication,
) -> Result<JsonResponse> {
    let Some(id) = admin_id(&req) else {
        return bad_admin_id();
    };

    let request: UpdateAdminRequest = match parse_json(req.body()) {
        Ok(request) => request,
        Err(reason) => {
            warn!("Update admin parsing failed: {}", reason);
            return deliver_error_json("VALIDATION_ERROR", &reason, StatusCode::BAD_REQUEST);
        }
    };

    match state.auth.update_admin(auth.identity(), id, request).await {
        Ok(profile) => deliver_success_json(Some(profile), StatusCode::OK),
        Err(e) => deliver_auth_error(&e),
    }
}
