//! Front-end tooling.
//!
//! # Data Flow
//! ```text
//! primary process
//!     production  → vite.rs run_build (npx vite build, once)
//!     development → vite.rs DevServer (npx vite, until shutdown)
//!     disable_vite → nothing
//! ```

pub mod vite;

use tokio::task::JoinHandle;

use crate::config::{FlightConfig, Mode};
use crate::lifecycle::Shutdown;
pub use vite::{run_build, BuildOutcome, DevServer, ToolCommand};

/// Start whatever Vite work the mode calls for, in the background.
pub fn start(config: &FlightConfig, shutdown: &Shutdown) -> Option<JoinHandle<()>> {
    if config.frontend.vite_disabled {
        tracing::info!("Vite disabled");
        return None;
    }

    match config.mode {
        Mode::Production => {
            let tool = ToolCommand::vite_build(&config.app_home);
            Some(tokio::spawn(async move {
                run_build(&tool).await;
            }))
        }
        Mode::Development => {
            let tool = ToolCommand::vite_dev(&config.app_home, config.frontend.dev_port);
            match DevServer::spawn(tool) {
                Ok(server) => {
                    let shutdown = shutdown.subscribe();
                    Some(tokio::spawn(async move {
                        server.supervise(shutdown).await;
                    }))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start vite server");
                    None
                }
            }
        }
    }
}
