//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! shared listener
//!     → server.rs (pipeline assembly, serve until shutdown)
//!     → session.rs (signed cookie, Redis-backed session)
//!     → [routing: discovered backend modules]
//!     → proxy.rs (proxy routes, Vite dev fallback)
//!     → cache.rs (production static fallback)
//! ```

pub mod cache;
pub mod proxy;
pub mod server;
pub mod session;

pub use server::{build_app, run_worker, ServerError, SharedStores, WorkerServer};
