use hyper::Response;
use hyper::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::auth::errors::AuthError;
use crate::auth::identity::Authentication;
use crate::auth::service::AuthService;

/// Set on every response served under a degraded identity.
pub const AUTH_MODE_HEADER: &str = "x-auth-mode";

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Authenticate a request from its headers.
pub async fn authenticate_request(
    headers: &HeaderMap,
    auth: &AuthService,
) -> Result<Authentication, AuthError> {
    let result = auth.authenticate(bearer_token(headers)).await;

    match &result {
        Ok(Authentication::Verified(identity)) => {
            debug!("Authenticated admin {} ({})", identity.id, identity.role)
        }
        Ok(Authentication::Degraded(identity)) => {
            warn!("Degraded authentication for admin {}", identity.id)
        }
        Err(e) => debug!("Authentication failed: {}", e.to_code()),
    }

    result
}

pub fn mark_degraded<B>(response: &mut Response<B>) {
    response
        .headers_mut()
        .insert(AUTH_MODE_HEADER, HeaderValue::from_static("degraded"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
    }

    #[test]
    fn ignores_other_schemes() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
