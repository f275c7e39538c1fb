use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use tracing::{debug, warn};

use shared::types::AdminRole;

use crate::AppState;
use crate::auth::middleware::mark_degraded;
use crate::auth::{Authentication, Guard, authenticate_request};
use crate::handlers::http::utils::*;
use crate::handlers::http::{admins, auth};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two tiers:
//
//   OpenHandler     : no auth.  Receives (req, state).
//                     Use for: /health, login, refresh, logout.
//
//   GuardedHandler  : bearer token authenticated, then the route's Guard
//                     checked.  Receives (req, state, authentication).

type HandlerFuture = Pin<Box<dyn Future<Output = Result<JsonResponse>> + Send>>;

type OpenHandler = Box<dyn Fn(Request<Bytes>, AppState) -> HandlerFuture + Send + Sync>;

type GuardedHandler =
    Box<dyn Fn(Request<Bytes>, AppState, Authentication) -> HandlerFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No authentication check.
    Open(OpenHandler),

    /// Authentication plus an authorization guard, both run by the router.
    Guarded { guard: Guard, handler: GuardedHandler },
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn open<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn guarded<F, Fut>(mut self, method: Method, path: &str, guard: Guard, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, Authentication) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Guarded {
                guard,
                handler: Box::new(move |req, state, auth| Box::pin(handler(req, state, auth))),
            },
        });
        self
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.open(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.open(Method::POST, path, handler)
    }

    // ── Guarded (bearer token + Guard) ────────────────────────────────────────
    //
    // The router authenticates the caller and checks the guard before the
    // handler is called.  Handlers receive the `Authentication` and must NOT
    // repeat either check.

    pub fn get_guarded<F, Fut>(self, path: &str, guard: Guard, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, Authentication) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.guarded(Method::GET, path, guard, handler)
    }

    pub fn post_guarded<F, Fut>(self, path: &str, guard: Guard, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, Authentication) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.guarded(Method::POST, path, guard, handler)
    }

    pub fn put_guarded<F, Fut>(self, path: &str, guard: Guard, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, Authentication) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonResponse>> + Send + 'static,
    {
        self.guarded(Method::PUT, path, guard, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(&self, req: Request<Bytes>, state: AppState) -> Result<JsonResponse> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            if route.method != method || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Guarded { guard, handler } => {
                    let auth = match authenticate_request(req.headers(), &state.auth).await {
                        Ok(auth) => auth,
                        Err(e) => {
                            warn!("Auth rejected {} {}: {}", method, path, e.to_code());
                            return deliver_auth_error(&e);
                        }
                    };
                    let degraded = auth.is_degraded();

                    let mut response = match guard.check(Some(auth.identity())) {
                        Ok(()) => handler(req, state, auth).await?,
                        Err(e) => {
                            warn!(
                                "Guard rejected admin {} on {} {}: {}",
                                auth.identity().id,
                                method,
                                path,
                                e.to_code()
                            );
                            deliver_guard_error(&e)?
                        }
                    };

                    if degraded {
                        mark_degraded(&mut response);
                    }
                    Ok(response)
                }
            };
        }

        debug!("No route for {} {}", method, path);
        deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/admins/:id"  matches  "/api/admins/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

// ---------------------------------------------------------------------------
// API router
//
// Auth is enforced here at the routing level; handlers MUST NOT repeat
// the auth call.
// ---------------------------------------------------------------------------

pub fn build_api_router() -> Router {
    Router::new()
        // ── Public ───────────────────────────────────────────────────────────
        .get("/health", |_req, _state| async move {
            deliver_serialized_json(
                &serde_json::json!({"status": "success", "health": "ok"}),
                StatusCode::OK,
            )
        })
        .post("/api/auth/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/auth/refresh", |req, state| async move {
            auth::handle_refresh(req, state).await.context("Refresh failed")
        })
        .post("/api/auth/logout", |req, state| async move {
            auth::handle_logout(req, state).await.context("Logout failed")
        })
        // ── Own account ──────────────────────────────────────────────────────
        .get_guarded("/api/auth/me", Guard::Authenticated, |req, state, auth| async move {
            auth::handle_me(req, state, auth).await.context("Profile get failed")
        })
        .put_guarded(
            "/api/auth/profile",
            Guard::Authenticated,
            |req, state, auth| async move {
                auth::handle_update_profile(req, state, auth)
                    .await
                    .context("Profile update failed")
            },
        )
        .put_guarded(
            "/api/auth/password",
            Guard::Authenticated,
            |req, state, auth| async move {
                auth::handle_change_password(req, state, auth)
                    .await
                    .context("Password change failed")
            },
        )
        // ── Admin management ─────────────────────────────────────────────────
        .post_guarded(
            "/api/admins",
            Guard::roles(&[AdminRole::SuperAdmin]),
            |req, state, auth| async move {
                admins::handle_create_admin(req, state, auth)
                    .await
                    .context("Create admin failed")
            },
        )
        .get_guarded(
            "/api/admins/:id",
            Guard::permissions(&["admins:read"]),
            |req, state, auth| async move {
                admins::handle_get_admin(req, state, auth)
                    .await
                    .context("Get admin failed")
            },
        )
        .put_guarded(
            "/api/admins/:id",
            Guard::roles(&[AdminRole::SuperAdmin]),
            |req, state, auth| async move {
                admins::handle_update_admin(req, state, auth)
                    .await
                    .context("Update admin failed")
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_paths_match() {
        assert!(Router::path_matches("/api/auth/me", "/api/auth/me"));
        assert!(Router::path_matches("/api/auth/me", "/api/auth/me?x=1"));
        assert!(!Router::path_matches("/api/auth/me", "/api/auth/mee"));
    }

    #[test]
    fn params_match_one_segment() {
        assert!(Router::path_matches("/api/admins/:id", "/api/admins/42"));
        assert!(!Router::path_matches("/api/admins/:id", "/api/admins/"));
        assert!(!Router::path_matches("/api/admins/:id", "/api/admins/42/extra"));
        assert!(!Router::path_matches("/api/admins/:id", "/api/admins"));
    }
}
