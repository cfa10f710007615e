//! Sliding-window rate limiting keyed by client identity and route class
//!
//! The window state lives behind the `RateLimitStore` trait so the scaling
//! concern stays isolated: the in-process `MemoryRateLimitStore` suits a
//! single instance, a distributed key-value store can implement the same
//! trait for multi-instance deployments.

use crate::config::RateLimitsConfig;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a rate-limit check, carried into response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the active window resets
    pub reset_at_ms: u64,
}

impl RateDecision {
    /// Seconds until the window resets, rounded up (for `Retry-After`)
    pub fn retry_after_seconds(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

/// Storage backend for rate-limit windows
///
/// Implementations never fail: absence of prior state means "not yet
/// limited", and a broken backend should fail open rather than deny traffic.
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key`'s window and report the decision
    fn check(&self, key: &str, max_requests: u32, window_ms: u64, now_ms: u64) -> RateDecision;
}

/// A single counting window
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at_ms: u64,
}

/// Process-local window store
///
/// Expired windows are swept opportunistically on each check rather than by
/// a background task - fine at this scale, and the sweep keeps the map from
/// growing without bound.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn check(&self, key: &str, max_requests: u32, window_ms: u64, now_ms: u64) -> RateDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Lazy expiry of every stale window
        windows.retain(|_, w| w.reset_at_ms > now_ms);

        match windows.get_mut(key) {
            None => {
                let reset_at_ms = now_ms + window_ms;
                windows.insert(
                    key.to_string(),
                    RateWindow {
                        count: 1,
                        reset_at_ms,
                    },
                );
                RateDecision {
                    allowed: true,
                    limit: max_requests,
                    remaining: max_requests.saturating_sub(1),
                    reset_at_ms,
                }
            }
            Some(window) if window.count >= max_requests => RateDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                reset_at_ms: window.reset_at_ms,
            },
            Some(window) => {
                window.count += 1;
                RateDecision {
                    allowed: true,
                    limit: max_requests,
                    remaining: max_requests.saturating_sub(window.count),
                    reset_at_ms: window.reset_at_ms,
                }
            }
        }
    }
}

/// Rate limiter combining the rule table with a window store
pub struct RateLimiter {
    config: RateLimitsConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimitsConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    /// Resolve the applicable rule for a path by longest-prefix match
    ///
    /// Returns the route class (the matched prefix, or "default") together
    /// with the window parameters.
    pub fn resolve_rule(&self, path: &str) -> (String, u64, u32) {
        let best = self
            .config
            .rules
            .iter()
            .filter(|rule| path.starts_with(rule.prefix()))
            .max_by_key(|rule| rule.prefix().len());

        match best {
            Some(rule) => (
                rule.prefix().to_string(),
                rule.window_ms(),
                rule.max_requests(),
            ),
            None => (
                "default".to_string(),
                self.config.default_window_ms,
                self.config.default_max_requests,
            ),
        }
    }

    /// Check a request against the limiter at the current wall-clock time
    pub fn check(&self, identity: &str, path: &str) -> (RateDecision, String) {
        self.check_at(identity, path, now_ms())
    }

    /// Check at an explicit timestamp (deterministic tests)
    pub fn check_at(&self, identity: &str, path: &str, now_ms: u64) -> (RateDecision, String) {
        let (route_class, window_ms, max_requests) = self.resolve_rule(path);
        // Route class embedded in the key scopes windows per route class
        let key = format!("{}:{}", route_class, identity);
        let decision = self.store.check(&key, max_requests, window_ms, now_ms);
        (decision, route_class)
    }
}

/// Current Unix time in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Derive the rate-limit bucket key for a caller
///
/// First forwarded hop, else the real-ip header, else "unknown", combined
/// with the device id header and a truncated user agent. Recomputed per
/// request; nothing is stored about the caller beyond the window counter.
pub fn client_identity(headers: &HeaderMap) -> String {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .unwrap_or("unknown");

    let device_id = headers
        .get("x-device-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let ua_prefix: String = user_agent.chars().take(50).collect();

    format!("{}:{}:{}", ip, device_id, ua_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitsConfig;
    use axum::http::HeaderValue;

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            RateLimitsConfig::default(),
            Arc::new(MemoryRateLimitStore::new()),
        )
    }

    #[test]
    fn test_first_request_allowed_with_full_window() {
        let limiter = limiter();
        let (decision, class) = limiter.check_at("client-a", "/api/chat", 1_000);
        assert!(decision.allowed);
        assert_eq!(class, "/api/chat");
        assert_eq!(decision.limit, 20);
        assert_eq!(decision.remaining, 19);
        assert_eq!(decision.reset_at_ms, 1_000 + 60_000);
    }

    #[test]
    fn test_denies_after_max_requests_within_window() {
        let limiter = limiter();
        for i in 0..20 {
            let (decision, _) = limiter.check_at("client-a", "/api/chat", 1_000 + i);
            assert!(decision.allowed, "request {} should be allowed", i + 1);
        }
        let (decision, _) = limiter.check_at("client-a", "/api/chat", 2_000);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = limiter();
        for _ in 0..20 {
            limiter.check_at("client-a", "/api/chat", 1_000);
        }
        let (denied, _) = limiter.check_at("client-a", "/api/chat", 1_001);
        assert!(!denied.allowed);

        // Past reset_at the counter restarts at 1
        let (decision, _) = limiter.check_at("client-a", "/api/chat", 1_000 + 60_001);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 19);
    }

    #[test]
    fn test_identities_do_not_share_windows() {
        let limiter = limiter();
        for _ in 0..20 {
            limiter.check_at("client-a", "/api/chat", 1_000);
        }
        let (decision, _) = limiter.check_at("client-b", "/api/chat", 1_000);
        assert!(decision.allowed);
    }

    #[test]
    fn test_route_classes_do_not_share_windows() {
        let limiter = limiter();
        for _ in 0..20 {
            limiter.check_at("client-a", "/api/chat", 1_000);
        }
        // Same identity, different route class
        let (decision, class) = limiter.check_at("client-a", "/api/registration", 1_000);
        assert!(decision.allowed);
        assert_eq!(class, "/api/registration");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let limiter = limiter();
        let (class, _, max) = {
            let (c, w, m) = limiter.resolve_rule("/api/chat/quick/anything");
            (c, w, m)
        };
        assert_eq!(class, "/api/chat/quick");
        assert_eq!(max, 60);

        let (class, _, max) = limiter.resolve_rule("/api/chat/stream");
        assert_eq!(class, "/api/chat");
        assert_eq!(max, 20);
    }

    #[test]
    fn test_unmatched_path_uses_default_rule() {
        let limiter = limiter();
        let (class, window_ms, max) = limiter.resolve_rule("/api/tourism");
        assert_eq!(class, "default");
        assert_eq!(window_ms, 60_000);
        assert_eq!(max, 100);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at_ms: 10_500,
        };
        assert_eq!(decision.retry_after_seconds(10_000), 1);
        assert_eq!(decision.retry_after_seconds(9_000), 2);
        assert_eq!(decision.retry_after_seconds(11_000), 0);
    }

    #[test]
    fn test_expired_windows_are_swept() {
        let store = MemoryRateLimitStore::new();
        store.check("a", 5, 1_000, 0);
        store.check("b", 5, 1_000, 0);
        // Both windows expire by t=2000; the sweep runs on the next check
        store.check("c", 5, 1_000, 2_000);
        let windows = store.windows.lock().expect("lock should not be poisoned");
        assert_eq!(windows.len(), 1);
        assert!(windows.contains_key("c"));
    }

    #[test]
    fn test_client_identity_prefers_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert("user-agent", HeaderValue::from_static("Mozilla/5.0"));

        let identity = client_identity(&headers);
        assert!(identity.starts_with("203.0.113.7:"));
        assert!(identity.ends_with("Mozilla/5.0"));
    }

    #[test]
    fn test_client_identity_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.3"));
        assert!(client_identity(&headers).starts_with("198.51.100.3:"));

        let empty = HeaderMap::new();
        assert!(client_identity(&empty).starts_with("unknown:"));
    }

    #[test]
    fn test_client_identity_truncates_user_agent_by_chars() {
        let mut headers = HeaderMap::new();
        let long_ua = "a".repeat(200);
        headers.insert(
            "user-agent",
            HeaderValue::from_str(&long_ua).expect("valid header"),
        );
        let identity = client_identity(&headers);
        let ua_part = identity.rsplit(':').next().expect("has ua part");
        assert_eq!(ua_part.chars().count(), 50);
    }
}
