pub mod client_ip;
pub mod policy;
pub mod rate_limiter;

pub use client_ip::{ClientAddr, TrustedProxies};
pub use policy::{RateLimitClass, RateLimits};
pub use rate_limiter::{RateLimitDecision, RateLimitKey, RateLimiter, RateLimiterStats};
