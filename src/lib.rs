//! Flight: multi-process HTTP bootstrapper for single-page apps.
//!
//! A primary process keeps one worker per core alive; each worker serves the
//! discovered backend routes, sessions, rate limiting and the SPA build on a
//! shared port.

// Process model
pub mod cluster;
pub mod config;
pub mod lifecycle;

// Worker request path
pub mod http;
pub mod net;
pub mod routing;
pub mod security;
pub mod store;

// Tooling and cross-cutting concerns
pub mod error;
pub mod frontend;
pub mod observability;

pub use config::schema::FlightConfig;
pub use error::FlightError;
pub use http::WorkerServer;
pub use lifecycle::Shutdown;
