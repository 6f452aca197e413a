//! Per-client rate limiting.
//!
//! Each (client IP, tier) pair gets a bucket of tokens that refills
//! gradually over the configured window. Stale buckets are pruned inline
//! every few hundred checks.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::config::RateLimitConfig;
use crate::AppState;

/// Checks between pruning passes
const CLEANUP_EVERY: u64 = 512;

/// Rate limit tier for different endpoint types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// Listing, stats and booking endpoints
    Api,
    /// Register and login
    Auth,
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl RateLimitEntry {
    fn new(max_tokens: u32, now: Instant) -> Self {
        Self {
            tokens: max_tokens,
            window_start: now,
            last_request: now,
        }
    }
}

/// Thread-safe rate limiter using dashmap
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<(IpAddr, RateLimitTier), RateLimitEntry>,
    config: RateLimitConfig,
    window_duration: Duration,
    checks: AtomicU64,
}

/// Information about rate limit status
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            window_duration: Duration::from_secs(config.window_seconds),
            config,
            checks: AtomicU64::new(0),
        }
    }

    /// Consume a token for `ip` in `tier`.
    /// Returns the remaining budget, or the retry-after seconds when exhausted.
    pub fn check_rate_limit(&self, ip: IpAddr, tier: RateLimitTier) -> Result<RateLimitInfo, u64> {
        if !self.config.enabled {
            return Ok(RateLimitInfo {
                remaining: u32::MAX,
                limit: u32::MAX,
                reset_after: 0,
            });
        }

        if self.checks.fetch_add(1, Ordering::Relaxed) % CLEANUP_EVERY == CLEANUP_EVERY - 1 {
            self.cleanup_expired();
        }

        let max_tokens = self.max_tokens(tier);
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry((ip, tier))
            .or_insert_with(|| RateLimitEntry::new(max_tokens, now));

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window_duration {
            entry.tokens = max_tokens;
            entry.window_start = now;
        } else {
            // Refill proportionally to the time since the last request
            let since_last = now.duration_since(entry.last_request);
            let replenish_rate = max_tokens as f64 / self.window_duration.as_secs_f64();
            let replenished = (since_last.as_secs_f64() * replenish_rate) as u32;
            entry.tokens = entry.tokens.saturating_add(replenished).min(max_tokens);
        }
        entry.last_request = now;

        let reset_after = self
            .window_duration
            .saturating_sub(now.duration_since(entry.window_start))
            .as_secs();

        if entry.tokens > 0 {
            entry.tokens -= 1;
            Ok(RateLimitInfo {
                remaining: entry.tokens,
                limit: max_tokens,
                reset_after,
            })
        } else {
            Err(reset_after.max(1))
        }
    }

    fn max_tokens(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Api => self.config.api_requests_per_window,
            RateLimitTier::Auth => self.config.auth_requests_per_window,
        }
    }

    /// Drop buckets idle for more than two windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let expiry = self.window_duration * 2;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_request) < expiry);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Client IP used as the bucket key. The socket peer unless proxy headers
/// are trusted, in which case the first X-Forwarded-For hop or X-Real-IP wins.
fn extract_client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> IpAddr {
    let peer_ip = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    if !trust_proxy_headers {
        return peer_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(peer_ip)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit_api(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(&state, request, next, RateLimitTier::Api).await
}

pub async fn rate_limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(&state, request, next, RateLimitTier::Auth).await
}

async fn rate_limit_with_tier(
    state: &AppState,
    request: Request<Body>,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let ip = extract_client_ip(&request, state.config.rate_limit.trust_proxy_headers);

    match state.rate_limiter.check_rate_limit(ip, tier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            if info.limit != u32::MAX {
                let headers = response.headers_mut();
                headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
                headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
                headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_after));
            }
            response
        }
        Err(retry_after) => {
            tracing::warn!(%ip, ?tier, "Rate limit exceeded");
            let mut response = ApiError::rate_limited(format!(
                "Rate limit exceeded. Try again in {} seconds.",
                retry_after
            ))
            .into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            api_requests_per_window: 10,
            auth_requests_per_window: 5,
            window_seconds: 60,
            trust_proxy_headers: false,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_rate_limiter_allows_requests_under_limit() {
        let limiter = RateLimiter::new(test_config());
        for i in 0..10 {
            let result = limiter.check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api);
            assert!(result.is_ok(), "Request {} should be allowed", i);
        }
    }

    #[test]
    fn test_rate_limiter_blocks_after_limit() {
        let limiter = RateLimiter::new(test_config());
        for _ in 0..10 {
            let _ = limiter.check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api);
        }
        let retry_after = limiter
            .check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api)
            .unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_different_ips_have_separate_limits() {
        let limiter = RateLimiter::new(test_config());
        for _ in 0..10 {
            let _ = limiter.check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api);
        }
        assert!(limiter
            .check_rate_limit(ip("192.168.1.2"), RateLimitTier::Api)
            .is_ok());
    }

    #[test]
    fn test_auth_tier_is_separate_and_stricter() {
        let limiter = RateLimiter::new(test_config());
        let client = ip("10.0.0.1");
        for _ in 0..5 {
            assert!(limiter.check_rate_limit(client, RateLimitTier::Auth).is_ok());
        }
        assert!(limiter.check_rate_limit(client, RateLimitTier::Auth).is_err());
        assert!(limiter.check_rate_limit(client, RateLimitTier::Api).is_ok());
    }

    #[test]
    fn test_disabled_rate_limiting() {
        let mut config = test_config();
        config.enabled = false;
        let limiter = RateLimiter::new(config);
        for _ in 0..100 {
            assert!(limiter
                .check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api)
                .is_ok());
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::new(test_config());
        let _ = limiter.check_rate_limit(ip("192.168.1.1"), RateLimitTier::Api);
        assert_eq!(limiter.entry_count(), 1);
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_client_ip_ignores_forwarded_headers_by_default() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-real-ip", "203.0.113.8")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, false), ip("127.0.0.1"));

        let peer: SocketAddr = "198.51.100.4:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(extract_client_ip(&request, false), ip("198.51.100.4"));
    }

    #[test]
    fn test_client_ip_from_trusted_proxy_headers() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(extract_client_ip(&request, true), ip("203.0.113.7"));

        let request = Request::builder()
            .header("x-real-ip", "203.0.113.8")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, true), ip("203.0.113.8"));

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request, true), ip("127.0.0.1"));
    }
}
