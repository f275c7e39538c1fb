use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tower::{Layer, Service};
use tracing::{debug, warn};

use shared::types::ErrorResponse;

use crate::auth::{TokenIssuer, bearer_token};
use crate::security::{
    ClientAddr, RateLimitClass, RateLimitDecision, RateLimitKey, RateLimits, TrustedProxies,
};

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

type Body = BoxBody<Bytes, Infallible>;

/// Tower layer for per-class fixed-window rate limiting.
///
/// Requests to admin routes that carry a valid access token are counted
/// against the admin id; everything else is counted against the client IP.
#[derive(Clone, Debug)]
pub struct RateLimiterLayer {
    limits: RateLimits,
    proxies: TrustedProxies,
    tokens: TokenIssuer,
}

impl RateLimiterLayer {
    pub fn new(limits: RateLimits, proxies: TrustedProxies, tokens: TokenIssuer) -> Self {
        Self {
            limits,
            proxies,
            tokens,
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiterService {
            inner,
            limits: self.limits.clone(),
            proxies: self.proxies.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RateLimiterService<S> {
    inner: S,
    limits: RateLimits,
    proxies: TrustedProxies,
    tokens: TokenIssuer,
}

impl<S> RateLimiterService<S> {
    /// Work out which limiter and key a request is counted against.
    fn key_for<B>(&self, req: &Request<B>) -> Option<(RateLimitClass, bool, RateLimitKey)> {
        let peer = req.extensions().get::<ClientAddr>()?.0.ip();
        let class = RateLimitClass::classify(req.uri().path());

        if class == RateLimitClass::Admin {
            let admin_id = bearer_token(req.headers())
                .and_then(|token| self.tokens.verify_access(token).ok())
                .map(|claims| claims.sub);
            if let Some(id) = admin_id {
                return Some((class, true, RateLimitKey::Admin(id)));
            }
        }

        let ip = self.proxies.client_ip(peer, req.headers());
        Some((class, false, RateLimitKey::Ip(ip)))
    }
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimiterService<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let keyed = self.key_for(&req);
        let limits = self.limits.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some((class, authenticated, key)) = keyed else {
                warn!("Request without client address; skipping rate limit");
                return inner.call(req).await;
            };

            let limiter = limits.limiter_for(class, authenticated);
            let decision = limiter.check(&key).await;

            if !decision.allowed {
                warn!("Rate limited {} on {} routes", key, class);
                return Ok(too_many_requests(&decision));
            }

            let mut response = inner.call(req).await?;

            let mut remaining = decision.remaining;
            if class.refunds_success()
                && response.status().is_success()
                && limiter.refund(&key, decision.window_started).await
            {
                remaining = (remaining + 1).min(decision.limit);
                debug!("Refunded {} request for {}", class, key);
            }

            insert_rate_limit_headers(
                response.headers_mut(),
                &RateLimitDecision {
                    remaining,
                    ..decision
                },
            );
            Ok(response)
        })
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_secs()));
}

fn too_many_requests(decision: &RateLimitDecision) -> Response<Body> {
    let retry_after = decision.reset_secs();
    let error = ErrorResponse::new("RATE_LIMITED", "Too many requests, please try again later")
        .with_details(json!({ "retryAfter": retry_after }));
    let json = serde_json::to_string(&error).unwrap_or_default();

    let mut response = Response::new(Full::new(Bytes::from(json)).boxed());
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    insert_rate_limit_headers(headers, decision);

    response
}
