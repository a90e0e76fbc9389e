//! Mounting discovered route modules.
//!
//! # Responsibilities
//! - Compile each module's routes into handlers
//! - Join prefix and path
//! - Merge modules into one router; a module that conflicts with one already
//!   mounted is skipped as a whole
//!
//! # Design Decisions
//! - Routes are compiled at startup and immutable afterwards
//! - Unknown paths fall through to the pipeline fallback
//! - Known paths with other methods answer 405 with `Allow` (axum default)

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::{any, on, MethodFilter, MethodRouter},
    Router,
};
use thiserror::Error;
use tower_sessions::Session;

use crate::http::proxy::{self, HttpClient, ProxyError, Upstream};
use crate::http::session::ensure_session_id;
use crate::routing::discovery::LoadedModule;
use crate::routing::manifest::{ManifestError, RouteAction, RouteSpec};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unsupported method {0}")]
    Method(String),
    #[error("path must start with '/': {0}")]
    Path(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error("route conflicts with an already mounted route or is malformed")]
    Conflict,
}

/// Join a module prefix and a route path.
pub fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.to_string();
    }
    let prefix = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    };
    if path == "/" {
        prefix
    } else {
        format!("{prefix}{path}")
    }
}

fn method_router(spec: &RouteSpec, client: &HttpClient) -> Result<MethodRouter, RouteError> {
    let filter = match spec.method.to_ascii_uppercase().as_str() {
        "ANY" | "*" => None,
        other => {
            let method = Method::from_bytes(other.as_bytes())
                .map_err(|_| RouteError::Method(spec.method.clone()))?;
            Some(MethodFilter::try_from(method).map_err(|_| RouteError::Method(spec.method.clone()))?)
        }
    };

    let router = match &spec.action {
        RouteAction::Respond(response) => {
            let fixed = response.compile()?;
            let handler = move || {
                let fixed = fixed.clone();
                async move { fixed }
            };
            match filter {
                Some(filter) => on(filter, handler),
                None => any(handler),
            }
        }
        RouteAction::Proxy(target) => {
            let upstream = Arc::new(Upstream::parse(&target.upstream)?);
            let client = client.clone();
            let handler = move |session: Session, request: Request<Body>| {
                let upstream = upstream.clone();
                let client = client.clone();
                async move {
                    let session_id = ensure_session_id(&session).await;
                    proxy::forward(&client, &upstream, request, session_id).await
                }
            };
            match filter {
                Some(filter) => on(filter, handler),
                None => any(handler),
            }
        }
    };

    Ok(router)
}

/// Build one module's router.
pub fn module_router(module: &LoadedModule, client: &HttpClient) -> Result<Router, RouteError> {
    let mut router = Router::new();
    for spec in &module.module.routes {
        if !spec.path.starts_with('/') {
            return Err(RouteError::Path(spec.path.clone()));
        }
        let path = join_path(&module.module.prefix, &spec.path);
        let handler = method_router(spec, client)?;
        router = guarded(move || router.merge(Router::new().route(&path, handler)))?;
    }
    Ok(router)
}

/// Mount every module. Modules that fail to compile are logged and skipped.
pub fn mount(modules: &[LoadedModule], client: &HttpClient) -> Router {
    let mut router = Router::new();
    for module in modules {
        let base = router.clone();
        let mounted = module_router(module, client).and_then(|m| guarded(move || base.merge(m)));
        match mounted {
            Ok(merged) => {
                tracing::info!(
                    file = %module.source.display(),
                    routes = module.module.routes.len(),
                    "Mounted backend module"
                );
                router = merged;
            }
            Err(e) => {
                tracing::error!(file = %module.source.display(), error = %e, "Backend module not mounted");
            }
        }
    }
    router
}

// axum reports overlapping or malformed routes by panicking at registration.
fn guarded<F>(build: F) -> Result<Router, RouteError>
where
    F: FnOnce() -> Router,
{
    catch_unwind(AssertUnwindSafe(build)).map_err(|_| RouteError::Conflict)
}
