//! Admin authentication, authorization and rate limiting for the Chapel CMS
//! API.
//!
//! Request pipeline:
//!
//! ```text
//! hyper conn ─► CorsLayer ─► RateLimiterLayer ─► AppService ─► Router
//!                                                    │
//!                              auth middleware ◄─────┤ (protected routes)
//!                              guard check     ◄─────┘
//! ```

pub mod app;
pub mod auth;
pub mod database;
pub mod handlers;
pub mod security;
pub mod tower_middle;

pub use app::{AppService, AppState, service_stack};
