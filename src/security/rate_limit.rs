//! Per-client sliding-window rate limiting middleware.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Timestamps of the requests a client made inside the current window.
#[derive(Debug, Default)]
struct Window {
    hits: VecDeque<Instant>,
}

impl Window {
    fn evict(&mut self, now: Instant, length: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.duration_since(*oldest) >= length {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// State for the sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiterState {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request from `key` at `now` if it fits in the window.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        entry.evict(now, self.window);

        if entry.hits.len() < self.max_requests as usize {
            entry.hits.push_back(now);
            let remaining = self.max_requests - entry.hits.len() as u32;
            Decision::Allowed { remaining }
        } else {
            let retry_after = entry
                .hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            Decision::Limited { retry_after }
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Drop clients whose windows have fully expired.
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows.retain(|_, w| {
            w.evict(now, self.window);
            !w.hits.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state.check(&key) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rate_limited();

            let mut response = Response::new(Body::from(
                "Too many requests, please try again later.",
            ));
            *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiterState {
        RateLimiterState::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
        })
    }

    #[test]
    fn limits_inside_window() {
        let state = limiter(2, 60);
        let now = Instant::now();

        assert_eq!(state.check_at("1.2.3.4", now), Decision::Allowed { remaining: 1 });
        assert_eq!(state.check_at("1.2.3.4", now), Decision::Allowed { remaining: 0 });
        assert!(matches!(state.check_at("1.2.3.4", now), Decision::Limited { .. }));

        // Other clients are unaffected
        assert_eq!(state.check_at("5.6.7.8", now), Decision::Allowed { remaining: 1 });
    }

    #[test]
    fn window_slides() {
        let state = limiter(2, 10);
        let start = Instant::now();

        state.check_at("c", start);
        state.check_at("c", start + Duration::from_secs(5));
        assert_eq!(
            state.check_at("c", start + Duration::from_secs(8)),
            Decision::Limited { retry_after: Duration::from_secs(2) }
        );

        // First hit has left the window, second has not.
        assert_eq!(
            state.check_at("c", start + Duration::from_secs(10)),
            Decision::Allowed { remaining: 0 }
        );
        assert!(matches!(
            state.check_at("c", start + Duration::from_secs(11)),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn prune_keeps_active_clients() {
        let state = limiter(5, 60);
        state.check("a");
        state.check("b");
        state.prune();
        assert_eq!(state.tracked_clients(), 2);
    }
}
