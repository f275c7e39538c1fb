use std::fmt;
use std::time::Duration;

use tracing::debug;

use shared::types::server_config::{RateLimitConfig, WindowLimit};

use crate::security::rate_limiter::{RateLimiter, RateLimiterStats};

/// Route classes, each with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    General,
    /// Login attempts only.
    Auth,
    Admin,
    Upload,
    Analytics,
}

impl RateLimitClass {
    pub fn classify(path: &str) -> Self {
        if path == "/api/auth/login" {
            Self::Auth
        } else if path.starts_with("/api/admin") {
            Self::Admin
        } else if path.starts_with("/api/upload") {
            Self::Upload
        } else if path.starts_with("/api/analytics") {
            Self::Analytics
        } else {
            Self::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Admin => "admin",
            Self::Upload => "upload",
            Self::Analytics => "analytics",
        }
    }

    /// 2xx responses in this class are not counted.
    pub fn refunds_success(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl fmt::Display for RateLimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One limiter per class. The admin class splits into an authenticated
/// (keyed by admin id) and an anonymous (keyed by IP) budget.
#[derive(Debug, Clone)]
pub struct RateLimits {
    general: RateLimiter,
    auth: RateLimiter,
    admin_authenticated: RateLimiter,
    admin_anonymous: RateLimiter,
    upload: RateLimiter,
    analytics: RateLimiter,
}

fn limiter(limit: &WindowLimit) -> RateLimiter {
    RateLimiter::new(limit.max_requests, Duration::from_secs(limit.window_secs))
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let admin_window = Duration::from_secs(config.admin.window_secs);

        Self {
            general: limiter(&config.general),
            auth: limiter(&config.auth),
            admin_authenticated: RateLimiter::new(config.admin.authenticated_max, admin_window),
            admin_anonymous: RateLimiter::new(config.admin.anonymous_max, admin_window),
            upload: limiter(&config.upload),
            analytics: limiter(&config.analytics),
        }
    }

    pub fn limiter_for(&self, class: RateLimitClass, authenticated: bool) -> &RateLimiter {
        match class {
            RateLimitClass::General => &self.general,
            RateLimitClass::Auth => &self.auth,
            RateLimitClass::Admin if authenticated => &self.admin_authenticated,
            RateLimitClass::Admin => &self.admin_anonymous,
            RateLimitClass::Upload => &self.upload,
            RateLimitClass::Analytics => &self.analytics,
        }
    }

    fn all(&self) -> [(&'static str, &RateLimiter); 6] {
        [
            ("general", &self.general),
            ("auth", &self.auth),
            ("admin_authenticated", &self.admin_authenticated),
            ("admin_anonymous", &self.admin_anonymous),
            ("upload", &self.upload),
            ("analytics", &self.analytics),
        ]
    }

    pub async fn cleanup(&self) {
        for (_, limiter) in self.all() {
            limiter.cleanup().await;
        }
        debug!("Rate limit windows cleaned up");
    }

    pub async fn stats(&self) -> Vec<(&'static str, RateLimiterStats)> {
        let mut out = Vec::with_capacity(6);
        for (name, limiter) in self.all() {
            out.push((name, limiter.stats().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_paths() {
        assert_eq!(RateLimitClass::classify("/api/auth/login"), RateLimitClass::Auth);
        assert_eq!(RateLimitClass::classify("/api/auth/refresh"), RateLimitClass::General);
        assert_eq!(RateLimitClass::classify("/api/admins/42"), RateLimitClass::Admin);
        assert_eq!(RateLimitClass::classify("/api/admin/stats"), RateLimitClass::Admin);
        assert_eq!(RateLimitClass::classify("/api/upload/image"), RateLimitClass::Upload);
        assert_eq!(
            RateLimitClass::classify("/api/analytics/views"),
            RateLimitClass::Analytics
        );
        assert_eq!(RateLimitClass::classify("/health"), RateLimitClass::General);
    }

    #[test]
    fn default_ceilings() {
        let limits = RateLimits::from_config(&RateLimitConfig::default());
        assert_eq!(limits.limiter_for(RateLimitClass::General, false).max_requests(), 100);
        assert_eq!(limits.limiter_for(RateLimitClass::Auth, false).max_requests(), 5);
        assert_eq!(limits.limiter_for(RateLimitClass::Admin, true).max_requests(), 1000);
        assert_eq!(limits.limiter_for(RateLimitClass::Admin, false).max_requests(), 100);
        assert_eq!(limits.limiter_for(RateLimitClass::Upload, false).max_requests(), 50);
        assert_eq!(limits.limiter_for(RateLimitClass::Analytics, true).max_requests(), 300);
    }

    #[test]
    fn only_login_refunds_success() {
        assert!(RateLimitClass::Auth.refunds_success());
        assert!(!RateLimitClass::General.refunds_success());
        assert!(!RateLimitClass::Admin.refunds_success());
    }
}
