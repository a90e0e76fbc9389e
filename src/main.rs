//! Flight
//!
//! Multi-process HTTP bootstrapper for Vite single-page apps.
//!
//! # Architecture Overview
//!
//! ```text
//!   flight (primary)
//!   ├── config      CLI > env > flight.toml > defaults (FLIGHT_MODE > --mode)
//!   ├── frontend    vite build (production) | vite dev server (development)
//!   ├── metrics     optional Prometheus exporter
//!   └── cluster     Supervisor: one slot per core, refill on exit
//!         │
//!         ▼  re-exec: flight <args> --worker <slot>
//!   flight (worker) ×N, all on the same port
//!   ├── store       Redis pool (sessions, rate-limit counters, response cache)
//!   ├── routing     **/*.backend.toml → axum routes
//!   └── http        trace → request id → timeout → [compression → rate limit]
//!                   → cors → body limit → session → routes → fallback
//! ```

use clap::Parser;
use tracing::Instrument;

use flight::cluster::{ProcessLauncher, Supervisor};
use flight::config::{available_cores, load_config, Cli, FlightConfig};
use flight::lifecycle::{signals, Shutdown};
use flight::observability::{logging, metrics};
use flight::{frontend, http, FlightError};

#[tokio::main]
async fn main() -> Result<(), FlightError> {
    let cli = Cli::parse();
    logging::init_logging();

    let config = load_config(&cli, available_cores())?;
    let shutdown = Shutdown::new();
    let _signals = signals::spawn_signal_listener(shutdown.clone());

    match cli.worker {
        Some(slot) => {
            let span = tracing::info_span!(
                "flight",
                mode = %config.mode,
                role = "worker",
                slot,
                pid = std::process::id()
            );
            run_worker(config, shutdown).instrument(span).await
        }
        None => {
            let span = tracing::info_span!("flight", mode = %config.mode, role = "primary");
            run_primary(config, shutdown).instrument(span).await
        }
    }
}

async fn run_worker(config: FlightConfig, shutdown: Shutdown) -> Result<(), FlightError> {
    http::run_worker(&config, shutdown.subscribe()).await?;
    Ok(())
}

async fn run_primary(config: FlightConfig, shutdown: Shutdown) -> Result<(), FlightError> {
    tracing::info!(
        app_home = %config.app_home.display(),
        address = %config.listener.bind_address(),
        workers = config.worker_count,
        "flight v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    if config.session.uses_default_key() {
        tracing::warn!("Using the default app key; set FLIGHT_APP_KEY and FLIGHT_APP_SECRET");
    }

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr);
    }

    let launcher = ProcessLauncher::current()?;
    let frontend = frontend::start(&config, &shutdown);

    let result = Supervisor::new(launcher, config.worker_count)
        .run(shutdown.subscribe())
        .await;
    shutdown.trigger();

    if let Some(task) = frontend {
        task.abort();
    }

    let report = result?;
    tracing::info!(
        launched = report.launched,
        restarted = report.restarted,
        "Shutdown complete"
    );
    Ok(())
}
