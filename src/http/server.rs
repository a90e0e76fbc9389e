//! Worker HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the middleware pipeline around the discovered routes
//! - Pick the fallback for the mode (static build, Vite proxy or 404)
//! - Serve on the shared listener until shutdown
//!
//! # Pipeline (outermost first)
//! ```text
//! request id → trace → propagate id → timeout
//!     → [production] compression → rate limit
//!     → cors → body limit → session
//!     → backend routes
//!     → fallback: [production] cache → dist | [development] Vite proxy | 404
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::from_fn_with_state,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tower_sessions::SessionStore;
use tower_sessions_redis_store::RedisStore;

use crate::config::{FlightConfig, Mode};
use crate::http::cache::{cache_middleware, ResponseCache};
use crate::http::proxy::{self, HttpClient, Upstream};
use crate::http::session;
use crate::lifecycle::shutdown;
use crate::net::{bind_shared, ListenerError};
use crate::routing::{self, LoadedModule};
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::store::{self, CounterStore, RedisStores, ResponseStore, StoreError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backends shared by every worker.
pub struct SharedStores<S> {
    pub counters: Arc<dyn CounterStore>,
    pub responses: Arc<dyn ResponseStore>,
    pub sessions: S,
}

/// Build the full worker application.
pub fn build_app<S>(config: &FlightConfig, modules: &[LoadedModule], stores: SharedStores<S>) -> Router
where
    S: SessionStore + Clone,
{
    let client = proxy::http_client();

    let app = routing::mount(modules, &client).fallback_service(fallback(config, &client, stores.responses));
    let app = session::with_sessions(app, stores.sessions, &config.session)
        .layer(RequestBodyLimitLayer::new(config.limits.payload_limit))
        .layer(cors());

    let app = if config.mode.is_production() {
        let limiter = Arc::new(RateLimiter::new(stores.counters, config.rate_limit.clone()));
        app.layer(from_fn_with_state(limiter, rate_limit_middleware))
            .layer(CompressionLayer::new())
    } else {
        app
    };

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.limits.request_timeout_secs),
            )),
    )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn fallback(config: &FlightConfig, client: &HttpClient, responses: Arc<dyn ResponseStore>) -> Router {
    match config.mode {
        Mode::Production => {
            let dist = config.dist_dir();
            tracing::debug!(dist = %dist.display(), "Serving static build");
            let files = ServeDir::new(&dist).fallback(ServeFile::new(dist.join("index.html")));
            let cache = Arc::new(ResponseCache::new(
                responses,
                Duration::from_secs(config.cache.ttl_secs),
            ));
            Router::new()
                .fallback_service(files)
                .layer(from_fn_with_state(cache, cache_middleware))
        }
        Mode::Development if !config.frontend.vite_disabled => {
            let upstream = Arc::new(Upstream::local(config.frontend.dev_port));
            let client = client.clone();
            Router::new().fallback(move |request: Request<Body>| {
                let upstream = upstream.clone();
                let client = client.clone();
                async move { proxy::forward(&client, &upstream, request, None).await }
            })
        }
        Mode::Development => Router::new().fallback(|| async { StatusCode::NOT_FOUND }),
    }
}

/// One worker's HTTP server.
pub struct WorkerServer {
    app: Router,
}

impl WorkerServer {
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "Server worker {} started, all backend services are running on port {}",
            std::process::id(),
            addr.port()
        );

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Everything a worker process does: connect, discover, build, serve.
pub async fn run_worker(
    config: &FlightConfig,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let pool = store::redis::connect(&config.redis).await?;
    let shared = Arc::new(RedisStores::new(pool.clone()));
    let stores = SharedStores {
        counters: shared.clone(),
        responses: shared,
        sessions: RedisStore::new(pool),
    };

    let modules = routing::load_modules(&config.app_home);
    tracing::info!(modules = modules.len(), "Backend modules discovered");

    let app = build_app(config, &modules, stores);
    let listener = bind_shared(config.listener.bind_address())?;
    WorkerServer::new(app).run(listener, shutdown_rx).await
}
