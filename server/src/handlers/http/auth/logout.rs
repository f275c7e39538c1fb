use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::header::SET_COOKIE;
use hyper::{Request, StatusCode};
use tracing::info;

use crate::AppState;
use crate::handlers::http::auth::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, secure_cookies};
use crate::handlers::http::utils::*;

/// POST /api/auth/logout
///
/// Refresh tokens are not tracked server-side, so logging out only clears
/// the cookie. Outstanding access tokens run until they expire.
pub async fn handle_logout(req: Request<Bytes>, state: AppState) -> Result<JsonResponse> {
    info!("Admin logged out");

    let cleared = delete_cookie(
        REFRESH_COOKIE_NAME,
        REFRESH_COOKIE_PATH,
        secure_cookies(req.headers(), &state),
    )
    .context("Failed to create cookie removal header")?;

    let mut response = deliver_serialized_json(
        &serde_json::json!({
            "status": "success",
            "message": "Logged out successfully"
        }),
        StatusCode::OK,
    )?;
    response.headers_mut().insert(SET_COOKIE, cleared);

    Ok(response)
}
