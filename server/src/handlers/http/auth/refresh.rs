use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::header::SET_COOKIE;
use hyper::{Request, StatusCode};
use tracing::{debug, warn};

use shared::types::{RefreshRequest, RefreshResponse};

use crate::AppState;
use crate::auth::AuthError;
use crate::auth::middleware::mark_degraded;
use crate::handlers::http::auth::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, secure_cookies};
use crate::handlers::http::utils::*;

/// POST /api/auth/refresh
///
/// Reads the refresh token from the `refreshToken` cookie, then from a
/// `{refreshToken}` body. Any 401 also clears the cookie.
pub async fn handle_refresh(req: Request<Bytes>, state: AppState) -> Result<JsonResponse> {
    let token = get_cookie(req.headers(), REFRESH_COOKIE_NAME).or_else(|| {
        if req.body().is_empty() {
            return None;
        }
        parse_json::<RefreshRequest>(req.body())
            .ok()
            .and_then(|body| body.refresh_token)
            .filter(|t| !t.is_empty())
    });

    let result = match token {
        Some(token) => state.auth.refresh(&token).await,
        None => {
            debug!("Refresh requested without a token");
            Err(AuthError::RefreshInvalid)
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let mut response = deliver_auth_error(&e)?;
            if e.status() == StatusCode::UNAUTHORIZED {
                warn!("Refresh rejected ({}); clearing cookie", e.to_code());
                let cleared = delete_cookie(
                    REFRESH_COOKIE_NAME,
                    REFRESH_COOKIE_PATH,
                    secure_cookies(req.headers(), &state),
                )
                .context("Failed to create cookie removal header")?;
                response.headers_mut().insert(SET_COOKIE, cleared);
            }
            return Ok(response);
        }
    };

    let mut response = deliver_serialized_json(
        &RefreshResponse::success(outcome.access_token, outcome.expires_in),
        StatusCode::OK,
    )?;

    if outcome.degraded {
        mark_degraded(&mut response);
    }

    Ok(response)
}
