//! Fixed-window rate limiting per client IP.
//!
//! Counters live in a [`CounterStore`]; with the Redis store every worker
//! shares the same window for a client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::store::{CounterStore, StoreError};

pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("rate-limit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("rate-limit-reset");
pub const RATE_LIMIT_TOTAL: HeaderName = HeaderName::from_static("rate-limit-total");

/// Outcome of counting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub total: u64,
    pub remaining: u64,
    pub reset_in: Duration,
    pub limited: bool,
}

impl RateLimitStatus {
    /// Window reset as unix seconds, rounded up.
    pub fn reset_at(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (now + self.reset_in).as_secs_f64().ceil() as u64
    }

    /// Seconds a limited client should wait, at least one.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_in.as_secs_f64().ceil().max(1.0) as u64
    }

    fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(self.reset_at()));
        headers.insert(RATE_LIMIT_TOTAL, HeaderValue::from(self.total));
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count a request from `client` against its window.
    pub async fn check(&self, client: &str) -> Result<RateLimitStatus, StoreError> {
        let window = Duration::from_millis(self.config.window_ms);
        let hit = self.store.hit(client, window).await?;
        Ok(RateLimitStatus {
            total: self.config.max,
            remaining: self.config.max.saturating_sub(hit.count),
            reset_in: hit.reset_in,
            limited: hit.count > self.config.max,
        })
    }

    pub fn message(&self) -> &str {
        &self.config.message
    }
}

/// Client key for limiting: the peer IP, when the server was started with
/// connect info.
pub fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing the fixed window and writing the limit headers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);

    let status = match limiter.check(&client).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Rate limit store unavailable, allowing request");
            return next.run(request).await;
        }
    };

    if status.limited {
        tracing::warn!(client = %client, total = status.total, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = (StatusCode::TOO_MANY_REQUESTS, limiter.message().to_string()).into_response();
        status.write_headers(response.headers_mut());
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(status.retry_after_secs()));
        return response;
    }

    let mut response = next.run(request).await;
    status.write_headers(response.headers_mut());
    response
}
