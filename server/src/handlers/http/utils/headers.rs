use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use hyper::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

/// Extract a header value as a string
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract cookie value by name
pub fn get_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name.trim() == cookie_name).then(|| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
}

/// True when the client reached us over TLS, as reported by the proxy.
pub fn is_https(headers: &HeaderMap) -> bool {
    get_header_value(headers, "x-forwarded-proto")
        .and_then(|proto| proto.split(',').next().map(|p| p.trim().to_string()))
        .map(|proto| proto.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Set a cookie with options. `SameSite=Strict` is always applied.
pub fn set_cookie(
    name: &str,
    value: &str,
    max_age: Option<Duration>,
    path: Option<&str>,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue> {
    let mut cookie = format!("{}={}", name, value);

    if let Some(age) = max_age {
        let expires = if age.is_zero() {
            UNIX_EPOCH
        } else {
            SystemTime::now() + age
        };
        cookie.push_str(&format!("; Max-Age={}", age.as_secs()));
        cookie.push_str(&format!("; Expires={}", httpdate::fmt_http_date(expires)));
    }

    if let Some(p) = path {
        cookie.push_str(&format!("; Path={}", p));
    }

    if http_only {
        cookie.push_str("; HttpOnly");
    }

    if secure {
        cookie.push_str("; Secure");
    }

    cookie.push_str("; SameSite=Strict");

    debug!("Setting cookie: {}", name);

    HeaderValue::from_str(&cookie).map_err(|e| {
        warn!("Failed to create cookie header for {}: {}", name, e);
        anyhow!("Invalid cookie value: {}", e)
    })
}

/// Create a persistent http-only cookie scoped to `path`
pub fn create_persistent_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    secure: bool,
) -> Result<HeaderValue> {
    debug!(
        "Creating persistent cookie: {} with max_age: {:?}",
        name, max_age
    );
    set_cookie(name, value, Some(max_age), Some(path), true, secure)
}

/// Delete a cookie by setting it to expire
pub fn delete_cookie(name: &str, path: &str, secure: bool) -> Result<HeaderValue> {
    debug!("Deleting cookie: {}", name);
    set_cookie(name, "", Some(Duration::ZERO), Some(path), true, secure)
}
