//! Multi-process worker pool.
//!
//! # Data Flow
//! ```text
//! primary
//!     → supervisor.rs (one slot per worker, refill on exit)
//!     → launcher.rs (current exe + own args + --worker <slot>)
//!     → worker process: http::server::run_worker on the shared port
//! ```
//!
//! # Design Decisions
//! - Workers are separate OS processes; nothing is shared but Redis and the port
//! - The launcher is a trait so the restart policy can be tested without processes

pub mod launcher;
pub mod supervisor;

pub use launcher::{ChildWorker, ProcessLauncher};
pub use supervisor::{
    Supervisor, SupervisorError, SupervisorReport, WorkerExit, WorkerLauncher, WorkerProcess,
};
