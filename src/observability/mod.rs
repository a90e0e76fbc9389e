//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing events, EnvFilter controlled)
//!     → metrics.rs (worker counters and gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape on the primary, when a metrics address is set
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the default filter
//! - Metrics updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
