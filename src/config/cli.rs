//! Command-line flags and their environment variable fallbacks.
//!
//! Every value is captured as raw text; validation and defaults live in
//! `validation.rs` so that a bad flag is warned about and replaced instead of
//! rejected by the parser.

use std::path::PathBuf;

use clap::Parser;

pub const MODE_ENV: &str = "FLIGHT_MODE";

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "flight")]
#[command(about = "Multi-process HTTP bootstrapper for Vite single-page apps", long_about = None)]
pub struct Cli {
    /// Application home; route discovery and relative paths start here.
    #[arg(long = "app_home", alias = "app-home", env = "FLIGHT_APP_HOME")]
    pub app_home: Option<PathBuf>,

    /// `development` or `production`. `FLIGHT_MODE` overrides this flag.
    #[arg(long)]
    pub mode: Option<String>,

    /// `FLIGHT_MODE`, captured at parse time. Unlike every other setting the
    /// environment wins over the flag for mode.
    #[arg(skip = std::env::var(MODE_ENV).ok())]
    pub mode_env: Option<String>,

    /// Session signing key.
    #[arg(long = "app_key", alias = "app-key", env = "FLIGHT_APP_KEY", hide_env_values = true)]
    pub app_key: Option<String>,

    /// Session signing secret, mixed into the key.
    #[arg(long = "app_secret", alias = "app-secret", env = "FLIGHT_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    #[arg(long = "cookie_name", alias = "cookie-name", env = "FLIGHT_COOKIE_NAME")]
    pub cookie_name: Option<String>,

    /// Session lifetime in milliseconds.
    #[arg(long = "session_duration", alias = "session-duration", env = "FLIGHT_SESSION_DURATION_MS")]
    pub session_duration: Option<String>,

    #[arg(long, env = "FLIGHT_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "FLIGHT_PORT")]
    pub port: Option<String>,

    /// Maximum request body, e.g. `1mb`, `512kb` or a byte count.
    #[arg(long = "payload_limit", alias = "payload-limit", env = "FLIGHT_PAYLOAD_LIMIT")]
    pub payload_limit: Option<String>,

    /// Request timeout in seconds.
    #[arg(long = "request_timeout", alias = "request-timeout", env = "FLIGHT_REQUEST_TIMEOUT_SECS")]
    pub request_timeout: Option<String>,

    #[arg(long = "redis_host", alias = "redis-host", env = "FLIGHT_REDIS_HOST")]
    pub redis_host: Option<String>,

    #[arg(long = "redis_port", alias = "redis-port", env = "FLIGHT_REDIS_PORT")]
    pub redis_port: Option<String>,

    /// Upper bound on worker processes; capped by the CPU count.
    #[arg(long = "max_workers", alias = "max-workers", env = "FLIGHT_MAX_WORKERS")]
    pub max_workers: Option<String>,

    /// Do not run Vite (no build, no dev server).
    #[arg(
        long = "disable_vite",
        alias = "disable-vite",
        env = "FLIGHT_DISABLE_VITE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub disable_vite: Option<String>,

    /// Production build directory.
    #[arg(long = "dist_path", alias = "dist-path", env = "FLIGHT_DIST_PATH")]
    pub dist_path: Option<PathBuf>,

    #[arg(long = "vite_port", alias = "vite-port", env = "FLIGHT_VITE_PORT")]
    pub vite_port: Option<String>,

    /// Prometheus scrape address for the primary process.
    #[arg(long = "metrics_address", alias = "metrics-address", env = "FLIGHT_METRICS_ADDR")]
    pub metrics_address: Option<String>,

    /// Optional TOML file providing defaults for the flags above.
    #[arg(long, env = "FLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Worker slot; set by the primary when it launches a worker.
    #[arg(long, hide = true)]
    pub worker: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_and_dash_flags() {
        let cli = Cli::try_parse_from([
            "flight",
            "--app_home",
            "/srv/app",
            "--payload-limit",
            "2mb",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(cli.app_home, Some(PathBuf::from("/srv/app")));
        assert_eq!(cli.payload_limit.as_deref(), Some("2mb"));
        assert_eq!(cli.port.as_deref(), Some("8080"));
    }

    #[test]
    fn test_disable_vite_without_value() {
        let cli = Cli::try_parse_from(["flight", "--disable_vite"]).unwrap();
        assert_eq!(cli.disable_vite.as_deref(), Some("true"));

        let cli = Cli::try_parse_from(["flight", "--disable_vite", "false"]).unwrap();
        assert_eq!(cli.disable_vite.as_deref(), Some("false"));
    }

    #[test]
    fn test_hidden_worker_slot() {
        let cli = Cli::try_parse_from(["flight", "--worker", "3"]).unwrap();
        assert_eq!(cli.worker, Some(3));
    }

    #[test]
    fn test_invalid_port_is_still_accepted_by_parser() {
        let cli = Cli::try_parse_from(["flight", "--port", "not-a-port"]).unwrap();
        assert_eq!(cli.port.as_deref(), Some("not-a-port"));
    }
}
