use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use dashmap::DashMap;

use crate::middleware::auth::AuthUser;

/// Named request budgets. Fixed per endpoint class, not per call.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

pub mod policy {
    use super::RateLimitPolicy;
    use std::time::Duration;

    /// Login-type endpoints.
    pub const AUTH: RateLimitPolicy = RateLimitPolicy {
        window: Duration::from_secs(15 * 60),
        max_requests: 5,
    };

    pub const READ: RateLimitPolicy = RateLimitPolicy {
        window: Duration::from_secs(60),
        max_requests: 60,
    };

    pub const WRITE: RateLimitPolicy = RateLimitPolicy {
        window: Duration::from_secs(60),
        max_requests: 10,
    };

    /// Destructive or high-value operations.
    pub const SENSITIVE: RateLimitPolicy = RateLimitPolicy {
        window: Duration::from_secs(60),
        max_requests: 3,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix millis when the current window ends.
    pub reset_at_ms: u64,
    /// Whole seconds until the window resets, set only when denied.
    pub retry_after_secs: Option<u64>,
}

struct WindowEntry {
    count: u32,
    reset_at_ms: u64,
}

/// Per-key fixed-window counter table.
///
/// Fixed window by design: a burst straddling the window boundary can pass
/// up to 2x max_requests. Counters are per process; a multi-instance
/// deployment needs an external shared store for global accuracy.
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, now_millis())
    }

    fn check_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> RateLimitDecision {
        let window_ms = policy.window.as_millis() as u64;
        let mut entry = self.entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at_ms: now_ms + window_ms,
        });

        if now_ms > entry.reset_at_ms {
            // Window expired, start a fresh one
            entry.count = 1;
            entry.reset_at_ms = now_ms + window_ms;
            return RateLimitDecision {
                allowed: true,
                remaining: policy.max_requests.saturating_sub(1),
                reset_at_ms: entry.reset_at_ms,
                retry_after_secs: None,
            };
        }

        entry.count += 1;

        if entry.count > policy.max_requests {
            let retry_after = (entry.reset_at_ms.saturating_sub(now_ms)).div_ceil(1000);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: entry.reset_at_ms,
                retry_after_secs: Some(retry_after),
            };
        }

        RateLimitDecision {
            allowed: true,
            remaining: policy.max_requests - entry.count,
            reset_at_ms: entry.reset_at_ms,
            retry_after_secs: None,
        }
    }

    /// Drop entries whose window has passed, bounding growth from one-off
    /// callers such as transient IPs.
    pub fn sweep(&self) {
        self.sweep_at(now_millis());
    }

    fn sweep_at(&self, now_ms: u64) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at_ms >= now_ms);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "rate limiter sweep removed expired windows");
        }
    }

    /// Spawn the periodic sweep; abort the returned handle on shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Derive the limiter key for a request: authenticated user id when known,
/// otherwise the caller IP from proxy headers, otherwise "unknown".
pub fn client_key(user: Option<&AuthUser>, headers: &HeaderMap) -> String {
    if let Some(user) = user {
        return format!("user:{}", user.id);
    }

    let forwarded_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match forwarded_ip.or(real_ip) {
        Some(ip) => format!("ip:{}", ip),
        None => "unknown".to_string(),
    }
}
