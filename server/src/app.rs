use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue, RETRY_AFTER};
use hyper::{Method, Request, Response, StatusCode};
use tower::{Service, ServiceBuilder};
use tower_http::cors::{AllowOrigin, Cors, CorsLayer};
use tracing::{error, warn};

use shared::types::server_config::{AppConfig, CorsConfig};

use crate::auth::{AUTH_MODE_HEADER, AuthService};
use crate::database::AdminStore;
use crate::handlers::http::utils::{JsonResponse, deliver_error_json, full};
use crate::handlers::http::{Router, build_api_router};
use crate::security::{RateLimits, TrustedProxies};
use crate::tower_middle::tower_rate_limiter::{
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET,
};
use crate::tower_middle::{RateLimiterLayer, RateLimiterService};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything a request handler can reach. Built once at startup.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub limits: RateLimits,
    pub proxies: TrustedProxies,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn AdminStore>) -> anyhow::Result<Self> {
        let auth = AuthService::from_config(store, &config.auth)
            .context("Failed to initialise auth service")?;
        let proxies = TrustedProxies::parse(&config.server.trusted_proxies)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid [server].trusted_proxies")?;

        Ok(Self {
            limits: RateLimits::from_config(&config.rate_limit),
            auth: Arc::new(auth),
            proxies,
            config: Arc::new(config),
        })
    }
}

// ---------------------------------------------------------------------------
// AppService
// ---------------------------------------------------------------------------

/// Innermost service: buffers the body (size-limited) and hands the request
/// to the router. Handler errors become a 500 JSON body.
#[derive(Clone, Debug)]
pub struct AppService {
    router: Arc<Router>,
    state: AppState,
}

impl AppService {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Arc::new(build_api_router()),
            state,
        }
    }
}

fn error_response(code: &str, message: &str, status: StatusCode) -> JsonResponse {
    deliver_error_json(code, message, status).unwrap_or_else(|e| {
        error!("Failed to build error response: {:#}", e);
        let mut response = Response::new(full(Bytes::new()));
        *response.status_mut() = status;
        response
    })
}

impl<B> Service<Request<B>> for AppService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = JsonResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let router = self.router.clone();
        let state = self.state.clone();
        let limit = state.config.server.max_body_bytes;

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let bytes = match Limited::new(body, limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                    warn!("Rejected {} {}: body over {} bytes", parts.method, parts.uri, limit);
                    return Ok(error_response(
                        "PAYLOAD_TOO_LARGE",
                        "Request body too large",
                        StatusCode::PAYLOAD_TOO_LARGE,
                    ));
                }
                Err(e) => {
                    warn!("Failed to read request body: {}", e);
                    return Ok(error_response(
                        "BAD_REQUEST",
                        "Failed to read request body",
                        StatusCode::BAD_REQUEST,
                    ));
                }
            };

            let req = Request::from_parts(parts, bytes);
            match router.route(req, state).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    error!("Handler error: {:#}", e);
                    Ok(error_response(
                        "INTERNAL_ERROR",
                        "An internal error occurred",
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ))
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Service stack
// ---------------------------------------------------------------------------

pub type AppStack = Cors<RateLimiterService<AppService>>;

/// Origins outside the allow-list get no CORS headers, in every environment.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([
            RATE_LIMIT_LIMIT,
            RATE_LIMIT_REMAINING,
            RATE_LIMIT_RESET,
            RETRY_AFTER,
            HeaderName::from_static(AUTH_MODE_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(24 * 60 * 60))
}

/// CORS → rate limiter → application.
pub fn service_stack(state: AppState) -> AppStack {
    let rate_limit = RateLimiterLayer::new(
        state.limits.clone(),
        state.proxies.clone(),
        state.auth.tokens().clone(),
    );

    ServiceBuilder::new()
        .layer(cors_layer(&state.config.cors))
        .layer(rate_limit)
        .service(AppService::new(state))
}
