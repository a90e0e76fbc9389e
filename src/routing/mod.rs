//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (per worker):
//!     app home
//!     → matcher.rs (which files and directories count)
//!     → discovery.rs (walk, parse *.backend.toml, keep default exports)
//!     → manifest.rs (route specs and actions)
//!     → router.rs (compile handlers, merge into one axum Router)
//!
//! Request:
//!     axum Router → matched route handler | 405 | pipeline fallback
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: files are mounted in sorted path order
//! - A broken module is skipped whole; the others still mount

pub mod discovery;
pub mod manifest;
pub mod matcher;
pub mod router;

pub use discovery::{find_backend_files, load_modules, LoadedModule};
pub use manifest::{BackendManifest, BackendModule, RouteAction, RouteSpec};
pub use router::{mount, RouteError};
