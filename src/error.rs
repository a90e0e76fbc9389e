//! Top-level error for the `flight` binary.

use thiserror::Error;

use crate::cluster::SupervisorError;
use crate::config::ConfigError;
use crate::http::ServerError;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("failed to locate the flight executable: {0}")]
    Executable(#[from] std::io::Error),
}
