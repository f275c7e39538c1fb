use std::convert::Infallible;

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use shared::types::ErrorResponse;

use crate::auth::{AuthError, GuardError};

pub type JsonResponse = Response<BoxBody<Bytes, Infallible>>;

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(data: &T, status: StatusCode) -> Result<JsonResponse> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))
}

/// Delivers a JSON error response with the specified error code, message, and status.
pub fn deliver_error_json(error_code: &str, message: &str, status: StatusCode) -> Result<JsonResponse> {
    deliver_error_response(&ErrorResponse::new(error_code, message), status)
}

pub fn deliver_error_response(error: &ErrorResponse, status: StatusCode) -> Result<JsonResponse> {
    if status.is_server_error() {
        warn!(
            "Delivering error JSON: {} - {} ({})",
            status.as_u16(),
            error.code,
            error.message
        );
    } else {
        debug!("Delivering error JSON: {} - {}", status.as_u16(), error.code);
    }

    deliver_serialized_json(error, status)
}

pub fn deliver_auth_error(error: &AuthError) -> Result<JsonResponse> {
    if let AuthError::Internal(detail) = error {
        warn!("Internal auth error: {}", detail);
    }
    deliver_error_response(&error.to_response(), error.status())
}

pub fn deliver_guard_error(error: &GuardError) -> Result<JsonResponse> {
    deliver_error_response(&error.to_response(), error.status())
}

/// Delivers a success JSON response with optional data.
pub fn deliver_success_json<T: Serialize>(data: Option<T>, status: StatusCode) -> Result<JsonResponse> {
    let body = match data {
        Some(d) => json!({
            "status": "success",
            "data": d
        }),
        None => json!({
            "status": "success"
        }),
    };

    deliver_serialized_json(&body, status)
}
