//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags ─┐
//! env vars ──┴→ cli.rs (raw text, CLI wins over env)
//! flight.toml → loader.rs (optional file layer)
//!     → validation.rs (merge, range checks, warn-and-default)
//!     → FlightConfig (resolved, immutable)
//!     → passed by reference to the supervisor or the worker server
//! ```
//!
//! # Design Decisions
//! - Each process resolves its own config; workers re-run the same resolution
//! - Invalid numbers are logged and replaced, never fatal
//! - An explicitly named config file must exist and parse

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{available_cores, load_config, ConfigError};
pub use schema::{
    CacheConfig, FileSettings, FlightConfig, FrontendConfig, LimitsConfig, ListenerConfig, Mode,
    ObservabilityConfig, RateLimitConfig, RedisConfig, SessionConfig,
};
