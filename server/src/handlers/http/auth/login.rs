use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::header::SET_COOKIE;
use hyper::{Request, StatusCode};
use tracing::{info, warn};

use shared::types::{LoginData, LoginResponse};

use crate::AppState;
use crate::auth::middleware::mark_degraded;
use crate::handlers::http::auth::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, secure_cookies};
use crate::handlers::http::utils::*;

/// POST /api/auth/login
///
/// Accepts `{email, password}` as JSON or a url-encoded form. On success the
/// refresh token is returned in the body and as an http-only cookie.
pub async fn handle_login(req: Request<Bytes>, state: AppState) -> Result<JsonResponse> {
    info!("Processing login request");

    let login: LoginData = match parse_json_or_form(req.headers(), req.body()) {
        Ok(data) => data,
        Err(reason) => {
            warn!("Login parsing failed: {}", reason);
            return deliver_error_json(
                "VALIDATION_ERROR",
                "Email and password are required",
                StatusCode::BAD_REQUEST,
            );
        }
    };

    let outcome = match state.auth.login(&login.email, &login.password).await {
        Ok(outcome) => outcome,
        Err(e) => return deliver_auth_error(&e),
    };

    let cookie = create_persistent_cookie(
        REFRESH_COOKIE_NAME,
        &outcome.tokens.refresh_token,
        Duration::from_secs(outcome.tokens.refresh_expires_in),
        REFRESH_COOKIE_PATH,
        secure_cookies(req.headers(), &state),
    )
    .context("Failed to create refresh cookie")?;

    let degraded = outcome.degraded;
    let mut response = deliver_serialized_json(
        &LoginResponse::success(outcome.admin, outcome.tokens),
        StatusCode::OK,
    )?;
    response.headers_mut().insert(SET_COOKIE, cookie);

    if degraded {
        mark_degraded(&mut response);
    }

    Ok(response)
}
