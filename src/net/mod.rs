//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! worker process
//!     → listener.rs (bind_shared: reuse address + port)
//!     → axum::serve on the shared port
//!
//! N workers bind the same address; the OS load-balances accepted
//! connections between them.
//! ```

pub mod listener;

pub use listener::{bind_shared, ListenerError};
