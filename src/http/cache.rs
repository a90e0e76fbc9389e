//! Response cache in front of the static build.
//!
//! # Responsibilities
//! - Replay stored `GET`/`HEAD` responses keyed by path and query
//! - Capture `200` responses with a known, small body and no cookies
//!   (length from `Content-Length` or the body's exact size)
//! - Mark responses with `X-Flight-Cache: HIT` or `MISS`
//!
//! # Design Decisions
//! - Bodies are captured before compression (the compression layer is outside)
//! - Store failures fall through to the inner service

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};

use crate::observability::metrics;
use crate::store::{CachedResponse, ResponseStore};

pub const X_FLIGHT_CACHE: HeaderName = HeaderName::from_static("x-flight-cache");

/// Largest body that will be captured.
pub const MAX_CACHEABLE_BYTES: usize = 1024 * 1024;

pub struct ResponseCache {
    store: Arc<dyn ResponseStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn ResponseStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

pub async fn cache_middleware(
    State(cache): State<Arc<ResponseCache>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let method = request.method().clone();
    if cache.ttl.is_zero() || !(method == Method::GET || method == Method::HEAD) {
        return next.run(request).await;
    }

    let key = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    match cache.store.get(&key).await {
        Ok(Some(hit)) => {
            tracing::debug!(key = %key, "Cache hit");
            metrics::record_cache_lookup(true);
            return replay(hit, method == Method::HEAD);
        }
        Ok(None) => metrics::record_cache_lookup(false),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Response cache lookup failed");
            return next.run(request).await;
        }
    }

    let response = next.run(request).await;
    if method != Method::GET || !is_cacheable(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHEABLE_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to buffer response for cache");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let captured = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter(|(name, _)| is_replayable_header(name))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: bytes.to_vec(),
    };

    if let Err(e) = cache.store.put(&key, captured, cache.ttl).await {
        tracing::warn!(key = %key, error = %e, "Failed to store response in cache");
    }

    parts.headers.insert(X_FLIGHT_CACHE, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

fn is_cacheable(response: &Response<Body>) -> bool {
    if response.status() != StatusCode::OK || response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }
    let declared = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    declared
        .or_else(|| response.body().size_hint().exact())
        .is_some_and(|len| len <= MAX_CACHEABLE_BYTES as u64)
}

fn is_replayable_header(name: &HeaderName) -> bool {
    name != header::CONTENT_LENGTH
        && name != header::SET_COOKIE
        && name != header::CONNECTION
        && name != header::TRANSFER_ENCODING
        && name != X_FLIGHT_CACHE
}

fn replay(hit: CachedResponse, head: bool) -> Response<Body> {
    let body = if head { Body::empty() } else { Body::from(hit.body.clone()) };
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(hit.status).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    for (name, value) in &hit.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(hit.body.len()));
    headers.insert(X_FLIGHT_CACHE, HeaderValue::from_static("HIT"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::{middleware::from_fn_with_state, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn app(ttl: Duration, calls: Arc<AtomicUsize>) -> Router {
        let cache = Arc::new(ResponseCache::new(Arc::new(MemoryStore::new()), ttl));
        Router::new()
            .route(
                "/asset.js",
                get(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        ([(header::CONTENT_TYPE, "text/javascript")], "console.log(1)")
                    }
                }),
            )
            .route(
                "/login",
                get(|| async { ([(header::SET_COOKIE, "a=b")], "hi") }),
            )
            .layer(from_fn_with_state(cache, cache_middleware))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(Duration::from_secs(30), calls.clone());

        let first = app.clone().oneshot(get_request("/asset.js")).await.unwrap();
        assert_eq!(first.headers()[X_FLIGHT_CACHE], "MISS");

        let second = app.clone().oneshot(get_request("/asset.js")).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()[X_FLIGHT_CACHE], "HIT");
        assert_eq!(second.headers()[header::CONTENT_TYPE], "text/javascript");
        let body = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"console.log(1)");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_is_part_of_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(Duration::from_secs(30), calls.clone());

        app.clone().oneshot(get_request("/asset.js?v=1")).await.unwrap();
        app.clone().oneshot(get_request("/asset.js?v=2")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_responses_with_cookies_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(Duration::from_secs(30), calls);

        let first = app.clone().oneshot(get_request("/login")).await.unwrap();
        assert!(first.headers().get(X_FLIGHT_CACHE).is_none());
        let second = app.oneshot(get_request("/login")).await.unwrap();
        assert!(second.headers().get(X_FLIGHT_CACHE).is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(Duration::ZERO, calls.clone());

        app.clone().oneshot(get_request("/asset.js")).await.unwrap();
        app.oneshot(get_request("/asset.js")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
