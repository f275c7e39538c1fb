use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// What a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    Ip(IpAddr),
    Admin(String),
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "ip:{}", ip),
            Self::Admin(id) => write!(f, "admin:{}", id),
        }
    }
}

/// Fixed-window request counter per key.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

#[derive(Debug)]
struct RateLimiterInner {
    windows: Mutex<HashMap<RateLimitKey, Window>>,
    max_requests: u32,
    window: Duration,
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started: Instant,
}

impl Window {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            started: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
    /// Start of the window this request was counted in.
    pub window_started: Instant,
}

impl RateLimitDecision {
    /// `reset_after` rounded up to whole seconds.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                windows: Mutex::new(HashMap::new()),
                max_requests,
                window,
            }),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.inner.max_requests
    }

    /// Count one request against `key` and report whether it fits.
    /// Rejected requests are not counted.
    pub async fn check(&self, key: &RateLimitKey) -> RateLimitDecision {
        let mut windows = self.inner.windows.lock().await;
        let now = Instant::now();

        let window = windows
            .entry(key.clone())
            .or_insert_with(|| Window::fresh(now));

        if now.duration_since(window.started) >= self.inner.window {
            *window = Window::fresh(now);
        }

        let allowed = window.count < self.inner.max_requests;
        if allowed {
            window.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit: self.inner.max_requests,
            remaining: self.inner.max_requests.saturating_sub(window.count),
            reset_after: self
                .inner
                .window
                .saturating_sub(now.duration_since(window.started)),
            window_started: window.started,
        }
    }

    /// Give back one counted request, e.g. a successful login.
    ///
    /// Only the window the request was counted in is credited; returns
    /// false when that window has since closed.
    pub async fn refund(&self, key: &RateLimitKey, window_started: Instant) -> bool {
        let mut windows = self.inner.windows.lock().await;
        match windows.get_mut(key) {
            Some(window) if window.started == window_started => {
                window.count = window.count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    /// Drop windows that have already closed.
    pub async fn cleanup(&self) {
        let mut windows = self.inner.windows.lock().await;
        let now = Instant::now();
        let span = self.inner.window;

        windows.retain(|_, window| now.duration_since(window.started) < span);
    }

    pub async fn stats(&self) -> RateLimiterStats {
        let windows = self.inner.windows.lock().await;

        RateLimiterStats {
            tracked_keys: windows.len(),
            exhausted_keys: windows
                .values()
                .filter(|w| w.count >= self.inner.max_requests)
                .count(),
            max_requests: self.inner.max_requests,
            window: self.inner.window,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub tracked_keys: usize,
    pub exhausted_keys: usize,
    pub max_requests: u32,
    pub window: Duration,
}
