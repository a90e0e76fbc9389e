//! Request forwarding to upstream HTTP services.
//!
//! Used by `proxy` routes in backend modules and, in development, by the
//! fallback that reverse-proxies the Vite dev server.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream authority
//! - Strip hop-by-hop headers both ways
//! - Append the client IP to `X-Forwarded-For`
//! - Map upstream failures to `502 Bad Gateway`

use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

pub type HttpClient = Client<HttpConnector, Body>;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FLIGHT_SESSION: HeaderName = HeaderName::from_static("x-flight-session");

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream url {url}: {reason}")]
    InvalidUpstream { url: String, reason: String },
}

pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// A parsed upstream base URL.
#[derive(Debug, Clone)]
pub struct Upstream {
    authority: Authority,
    base_path: String,
}

impl Upstream {
    pub fn parse(url: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError::InvalidUpstream {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri = Uri::from_str(url).map_err(|e| invalid(&e.to_string()))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid("only http:// upstreams are supported"));
        }
        let authority = uri.authority().cloned().ok_or_else(|| invalid("missing host"))?;
        if uri.query().is_some() {
            return Err(invalid("query strings are not allowed"));
        }

        Ok(Self {
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// Upstream for a dev server on localhost.
    pub fn local(port: u16) -> Self {
        Self {
            authority: Authority::from_str(&format!("127.0.0.1:{port}"))
                .unwrap_or_else(|_| Authority::from_static("127.0.0.1")),
            base_path: String::new(),
        }
    }

    /// URI on the upstream for an incoming request URI.
    pub fn target(&self, incoming: &Uri) -> Uri {
        let path_and_query = incoming.path_and_query().map(PathAndQuery::as_str).unwrap_or("/");
        let joined = format!("{}{}", self.base_path, path_and_query);

        let mut parts = incoming.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        parts.path_and_query = PathAndQuery::from_str(&joined).ok().or(parts.path_and_query);
        Uri::from_parts(parts).unwrap_or_else(|_| incoming.clone())
    }
}

/// Forward `request` to `upstream` and stream the response back.
pub async fn forward(
    client: &HttpClient,
    upstream: &Upstream,
    request: Request<Body>,
    session_id: Option<String>,
) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    parts.uri = upstream.target(&parts.uri);

    strip_hop_by_hop(&mut parts.headers);
    if let Ok(host) = HeaderValue::from_str(upstream.authority.as_str()) {
        parts.headers.insert(header::HOST, host);
    }
    if let Some(ip) = client_ip {
        let forwarded = match parts.headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{prior}, {ip}"),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }
    parts.headers.remove(&X_FLIGHT_SESSION);
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
        parts.headers.insert(X_FLIGHT_SESSION, value);
    }

    tracing::debug!(path = %path, upstream = %upstream.authority, "Proxying request");

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(path = %path, upstream = %upstream.authority, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}
