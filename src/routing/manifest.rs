//! Backend route module manifests.
//!
//! A route module is a `*.backend.toml` file. Only the `[default]` table is
//! mounted; a file without one is discovered but ignored.
//!
//! ```toml
//! [default]
//! prefix = "/api/todos"
//!
//! [[default.routes]]
//! method = "GET"
//! path = "/"
//! respond = { status = 200, json = [] }
//!
//! [[default.routes]]
//! method = "ANY"
//! path = "/{*rest}"
//! proxy = { upstream = "http://127.0.0.1:4000" }
//! ```

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid status code {0}")]
    Status(u16),
    #[error("invalid header {name}: {reason}")]
    Header { name: String, reason: String },
    #[error("`body` and `json` are mutually exclusive")]
    AmbiguousBody,
    #[error("json body could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendManifest {
    /// The module's default export; absent means "nothing to mount".
    pub default: Option<BackendModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendModule {
    /// Prepended to every route path.
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    /// HTTP method, or `ANY`.
    #[serde(default = "default_method")]
    pub method: String,

    pub path: String,

    #[serde(flatten)]
    pub action: RouteAction,
}

fn default_method() -> String {
    "ANY".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Answer with a fixed response.
    Respond(StaticResponse),
    /// Forward to an upstream HTTP service.
    Proxy(ProxyTarget),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticResponse {
    #[serde(default = "default_status")]
    pub status: u16,

    pub body: Option<String>,

    pub json: Option<serde_json::Value>,

    pub content_type: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyTarget {
    /// Base URL, e.g. `http://127.0.0.1:4000`. The request path is appended.
    pub upstream: String,
}

/// A validated, cheaply clonable response built from [`StaticResponse`].
#[derive(Debug, Clone)]
pub struct FixedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl StaticResponse {
    pub fn compile(&self) -> Result<FixedResponse, ManifestError> {
        let status = StatusCode::from_u16(self.status).map_err(|_| ManifestError::Status(self.status))?;

        let (body, default_type) = match (&self.body, &self.json) {
            (Some(_), Some(_)) => return Err(ManifestError::AmbiguousBody),
            (Some(text), None) => (Bytes::from(text.clone()), Some("text/plain; charset=utf-8")),
            (None, Some(value)) => (Bytes::from(serde_json::to_vec(value)?), Some("application/json")),
            (None, None) => (Bytes::new(), None),
        };

        let mut headers = HeaderMap::new();
        if let Some(content_type) = self.content_type.as_deref().or(default_type) {
            headers.insert(header::CONTENT_TYPE, header_value("content-type", content_type)?);
        }
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ManifestError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value(name, value)?);
        }

        Ok(FixedResponse { status, headers, body })
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ManifestError> {
    HeaderValue::from_str(value).map_err(|e| ManifestError::Header {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl IntoResponse for FixedResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest: BackendManifest = toml::from_str(
            r#"
            [default]
            prefix = "/api/todos"

            [[default.routes]]
            method = "GET"
            path = "/"
            respond = { status = 200, json = [1, 2] }

            [[default.routes]]
            path = "/{*rest}"
            proxy = { upstream = "http://127.0.0.1:4000" }
            "#,
        )
        .unwrap();

        let module = manifest.default.unwrap();
        assert_eq!(module.prefix, "/api/todos");
        assert_eq!(module.routes.len(), 2);
        assert_eq!(module.routes[1].method, "ANY");
        assert!(matches!(module.routes[0].action, RouteAction::Respond(_)));
        assert!(matches!(
            &module.routes[1].action,
            RouteAction::Proxy(ProxyTarget { upstream }) if upstream == "http://127.0.0.1:4000"
        ));
    }

    #[test]
    fn test_manifest_without_default_export() {
        let manifest: BackendManifest = toml::from_str("[helpers]\nname = \"x\"\n").unwrap();
        assert!(manifest.default.is_none());
    }

    #[test]
    fn test_compile_json_response() {
        let spec = StaticResponse {
            status: 201,
            body: None,
            json: Some(serde_json::json!({"ok": true})),
            content_type: None,
            headers: BTreeMap::from([("x-module".to_string(), "todos".to_string())]),
        };
        let response = spec.compile().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-module"], "todos");
    }

    #[test]
    fn test_compile_rejects_bad_input() {
        let mut spec = StaticResponse {
            status: 1000,
            body: None,
            json: None,
            content_type: None,
            headers: BTreeMap::new(),
        };
        assert!(matches!(spec.compile(), Err(ManifestError::Status(1000))));

        spec.status = 200;
        spec.body = Some("a".into());
        spec.json = Some(serde_json::Value::Null);
        assert!(matches!(spec.compile(), Err(ManifestError::AmbiguousBody)));

        spec.json = None;
        spec.headers.insert("bad header".into(), "x".into());
        assert!(matches!(spec.compile(), Err(ManifestError::Header { .. })));
    }
}
