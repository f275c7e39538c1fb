/// Tower middleware module
///
/// Layers that wrap the application service:
/// - per-route-class rate limiting
pub mod tower_rate_limiter;

pub use tower_rate_limiter::{RateLimiterLayer, RateLimiterService};
