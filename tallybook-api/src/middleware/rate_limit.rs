/// Fixed-window rate limiting per client address
///
/// Every request counts against a window of `RATE_LIMIT_WINDOW_SECS`
/// (default 900) keyed by client address; more than `RATE_LIMIT_MAX`
/// (default 600) requests in one window are rejected with 429.
///
/// # Storage
///
/// With Redis configured, counters live under `ratelimit:{client}` and are
/// shared by every API instance (see
/// [`RedisClient::fixed_window_hit`](tallybook_shared::redis::RedisClient::fixed_window_hit)).
/// Without Redis, or when a Redis call fails, counters are kept in process
/// memory.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: Requests allowed per window
/// - `X-RateLimit-Remaining`: Requests left in the current window
/// - `X-RateLimit-Reset`: Unix timestamp when the window resets
/// - `Retry-After`: Seconds to wait (429 responses only)

use crate::{app::AppState, config::RateLimitConfig, error::ApiError};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tallybook_shared::redis::{RedisClient, WindowHit};

/// Message returned with 429 responses
pub const RATE_LIMIT_MESSAGE: &str = "Muitas requisicoes. Tente novamente mais tarde.";

/// Local map size that triggers a sweep of expired windows
const LOCAL_SWEEP_THRESHOLD: usize = 10_000;

/// In-process window
#[derive(Debug, Clone, Copy)]
struct LocalWindow {
    started: Instant,
    count: u64,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,

    /// Seconds until the window resets
    pub reset_after: u64,
}

impl RateLimitDecision {
    fn from_hit(hit: WindowHit, limit: u64) -> Self {
        Self {
            allowed: hit.count <= limit,
            limit,
            remaining: limit.saturating_sub(hit.count),
            reset_after: hit.ttl_secs,
        }
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        let reset_at = chrono::Utc::now().timestamp().max(0) as u64 + self.reset_after;

        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
    }
}

/// Shared rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    redis: Option<RedisClient>,
    local: Arc<DashMap<String, LocalWindow>>,
}

impl RateLimiter {
    /// Creates a limiter that keeps counters in memory
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            redis: None,
            local: Arc::new(DashMap::new()),
        }
    }

    /// Moves counters to Redis
    pub fn with_redis(mut self, client: RedisClient) -> Self {
        self.redis = Some(client);
        self
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Counts one request for `client`
    pub async fn hit(&self, client: &str) -> RateLimitDecision {
        let window_secs = self.config.window_secs.max(1);

        let hit = match &self.redis {
            Some(redis) => {
                match redis
                    .fixed_window_hit(&format!("ratelimit:{}", client), window_secs)
                    .await
                {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis rate limit failed, counting locally");
                        self.hit_local(client, Instant::now())
                    }
                }
            }
            None => self.hit_local(client, Instant::now()),
        };

        RateLimitDecision::from_hit(hit, self.config.max_requests)
    }

    fn hit_local(&self, client: &str, now: Instant) -> WindowHit {
        let window = Duration::from_secs(self.config.window_secs.max(1));

        if self.local.len() > LOCAL_SWEEP_THRESHOLD {
            self.local
                .retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let mut entry = self.local.entry(client.to_string()).or_insert(LocalWindow {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= window {
            *entry = LocalWindow {
                started: now,
                count: 0,
            };
        }
        entry.count += 1;

        let elapsed = now.saturating_duration_since(entry.started);
        WindowHit {
            count: entry.count,
            ttl_secs: window.saturating_sub(elapsed).as_secs().max(1),
        }
    }
}

/// Client key: socket address, else first `X-Forwarded-For` entry
pub fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware layer
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let decision = state.rate_limiter.hit(&client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, limit = decision.limit, "Rate limit exceeded");
        ApiError::RateLimitExceeded {
            retry_after: decision.reset_after,
            message: RATE_LIMIT_MESSAGE.to_string(),
        }
        .into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}
