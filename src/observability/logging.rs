//! Structured logging.
//!
//! # Responsibilities
//! - Install the global tracing subscriber once per process
//!
//! # Design Decisions
//! - Human readable fmt output; workers share the primary's stdout
//! - Log level from `RUST_LOG`, falling back to `DEFAULT_FILTER`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "flight=info,tower_http=info";

pub fn init_logging() {
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
