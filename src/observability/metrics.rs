//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flight_workers_running` (gauge): live worker processes
//! - `flight_worker_restarts_total` (counter): replacements after an exit
//! - `flight_worker_launch_failures_total` (counter): failed spawns
//! - `flight_rate_limited_total` (counter): requests answered with 429
//! - `flight_cache_lookups_total` (counter): cache lookups by `result`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Serve `/metrics` on `addr`. Errors are logged; the server keeps running.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_workers_running(count: usize) {
    metrics::gauge!("flight_workers_running").set(count as f64);
}

pub fn record_worker_restart() {
    metrics::counter!("flight_worker_restarts_total").increment(1);
}

pub fn record_launch_failure() {
    metrics::counter!("flight_worker_launch_failures_total").increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("flight_rate_limited_total").increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("flight_cache_lookups_total", "result" => result).increment(1);
}
