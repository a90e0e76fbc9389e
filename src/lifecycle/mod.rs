//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Primary:
//!     resolve config → start Vite (build or dev) → supervisor forks workers
//!     SIGINT/SIGTERM → shutdown → workers terminated, dev server killed
//!
//! Worker:
//!     resolve config → connect Redis → discover routes → bind → serve
//!     SIGINT/SIGTERM → shutdown → stop accepting → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast shutdown signal per process
//! - No drain deadline; workers stop when axum's graceful shutdown completes

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
