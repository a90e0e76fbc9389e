//! Configuration resolution and validation.
//!
//! # Responsibilities
//! - Merge the CLI/env layer over the config file layer
//! - Mode is the exception: `FLIGHT_MODE` beats `--mode`
//! - Validate value ranges (port, durations, worker count)
//! - Replace invalid values with defaults, logging a warning
//!
//! # Design Decisions
//! - Bad numeric input never aborts startup
//! - Every function here is pure apart from logging
//! - Paths are resolved against app home; the working directory is untouched

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::config::cli::Cli;
use crate::config::schema::*;

/// Merge CLI/env over the config file and validate the result.
pub fn resolve(cli: &Cli, file: FileSettings, available_cores: usize) -> FlightConfig {
    let app_home = resolve_app_home(cli.app_home.as_deref().or(file.app_home.as_deref()));

    let mode = resolve_mode(
        cli.mode_env
            .clone()
            .or_else(|| layer(&cli.mode, &file.mode))
            .as_deref(),
    );

    let session = SessionConfig {
        app_key: layer(&cli.app_key, &file.app_key).unwrap_or_else(|| DEFAULT_APP_KEY.to_string()),
        app_secret: layer(&cli.app_secret, &file.app_secret).unwrap_or_default(),
        cookie_name: layer(&cli.cookie_name, &file.cookie_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
        max_age_ms: resolve_session_duration(
            layer_scalar(&cli.session_duration, &file.session_duration).as_deref(),
        ),
    };

    let listener = ListenerConfig {
        host: resolve_host(layer(&cli.host, &file.host).as_deref()),
        port: resolve_port(layer_scalar(&cli.port, &file.port).as_deref()),
    };

    let redis = RedisConfig {
        host: layer(&cli.redis_host, &file.redis_host)
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
        port: resolve_u16(
            "redis_port",
            layer_scalar(&cli.redis_port, &file.redis_port).as_deref(),
            DEFAULT_REDIS_PORT,
        ),
    };

    let worker_count = resolve_worker_count(
        layer_scalar(&cli.max_workers, &file.max_workers).as_deref(),
        available_cores,
    );

    let frontend = FrontendConfig {
        vite_disabled: resolve_flag(
            "disable_vite",
            layer_scalar(&cli.disable_vite, &file.disable_vite).as_deref(),
            false,
        ),
        dist_path: cli
            .dist_path
            .clone()
            .or(file.dist_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIST_PATH)),
        dev_port: resolve_u16(
            "vite_port",
            layer_scalar(&cli.vite_port, &file.vite_port).as_deref(),
            DEFAULT_VITE_PORT,
        ),
    };

    let limits = LimitsConfig {
        payload_limit: parse_payload_limit(layer_scalar(&cli.payload_limit, &file.payload_limit).as_deref()),
        request_timeout_secs: resolve_positive(
            "request_timeout",
            layer_scalar(&cli.request_timeout, &file.request_timeout).as_deref(),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ),
    };

    let observability = ObservabilityConfig {
        metrics_address: resolve_metrics_address(layer(&cli.metrics_address, &file.metrics_address).as_deref()),
    };

    let mut rate_limit = file.rate_limit;
    if rate_limit.window_ms == 0 {
        tracing::warn!("rate_limit.window_ms must be positive, using default");
        rate_limit.window_ms = RateLimitConfig::default().window_ms;
    }

    FlightConfig {
        app_home,
        mode,
        listener,
        session,
        redis,
        worker_count,
        frontend,
        limits,
        rate_limit,
        cache: file.cache,
        observability,
    }
}

fn layer(cli: &Option<String>, file: &Option<String>) -> Option<String> {
    cli.clone().or_else(|| file.clone())
}

fn layer_scalar(cli: &Option<String>, file: &Option<toml::Value>) -> Option<String> {
    cli.clone().or_else(|| file.as_ref().map(scalar_to_string))
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Absolute application home. Falls back to joining onto the current
/// directory when the path cannot be canonicalized.
pub fn resolve_app_home(raw: Option<&Path>) -> PathBuf {
    let raw = raw.unwrap_or_else(|| Path::new("."));
    match std::fs::canonicalize(raw) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(app_home = ?raw, error = %e, "Could not canonicalize app home");
            std::env::current_dir()
                .map(|cwd| cwd.join(raw))
                .unwrap_or_else(|_| raw.to_path_buf())
        }
    }
}

pub fn resolve_mode(raw: Option<&str>) -> Mode {
    match raw.map(|m| m.trim().to_ascii_lowercase()) {
        None => Mode::default(),
        Some(m) if m == "development" => Mode::Development,
        Some(m) if m == "production" => Mode::Production,
        Some(m) => {
            tracing::warn!(mode = %m, "Unknown mode, using production");
            Mode::Production
        }
    }
}

/// Port in `[1, 65535]`, otherwise [`DEFAULT_PORT`].
pub fn resolve_port(raw: Option<&str>) -> u16 {
    resolve_u16("port", raw, DEFAULT_PORT)
}

fn resolve_u16(name: &str, raw: Option<&str>, default: u16) -> u16 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if (1..=i64::from(u16::MAX)).contains(&value) => value as u16,
        Ok(value) => {
            tracing::warn!(setting = name, value, default, "Port out of range, using default");
            default
        }
        Err(e) => {
            tracing::warn!(setting = name, value = %raw, default, error = %e, "Invalid port, using default");
            default
        }
    }
}

/// Non-negative session lifetime in milliseconds, otherwise
/// [`DEFAULT_SESSION_DURATION_MS`].
pub fn resolve_session_duration(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_SESSION_DURATION_MS;
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) => ms,
        Err(e) => {
            tracing::warn!(
                value = %raw,
                default = DEFAULT_SESSION_DURATION_MS,
                error = %e,
                "Invalid session duration, using default"
            );
            DEFAULT_SESSION_DURATION_MS
        }
    }
}

/// `min(requested, available_cores)`; a missing, invalid or zero request
/// means "one per core".
pub fn resolve_worker_count(raw: Option<&str>, available_cores: usize) -> usize {
    let cores = available_cores.max(1);
    let requested = match raw.map(|r| r.trim().parse::<usize>()) {
        None => cores,
        Some(Ok(0)) => cores,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            tracing::warn!(value = ?raw, error = %e, "Invalid max workers, using CPU count");
            cores
        }
    };
    requested.min(cores)
}

pub fn resolve_flag(name: &str, raw: Option<&str>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" | "" => false,
        other => {
            tracing::warn!(setting = name, value = %other, default, "Invalid boolean, using default");
            default
        }
    }
}

fn resolve_positive(name: &str, raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!(setting = name, value = %raw, default, "Invalid value, using default");
            default
        }
    }
}

fn resolve_host(raw: Option<&str>) -> IpAddr {
    let default = ListenerConfig::default().host;
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        tracing::warn!(value = %raw, error = %e, "Invalid host address, using {}", default);
        default
    })
}

fn resolve_metrics_address(raw: Option<&str>) -> Option<SocketAddr> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(addr) => Some(addr),
        Err(e) => {
            tracing::error!(metrics_address = %raw, error = %e, "Failed to parse metrics address, metrics disabled");
            None
        }
    }
}

/// Parse a body size such as `1mb`, `512kb`, `2 gb` or `4096`.
/// Units are 1024-based; invalid input yields [`DEFAULT_PAYLOAD_LIMIT`].
pub fn parse_payload_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_PAYLOAD_LIMIT;
    };
    match parse_byte_size(raw) {
        Some(bytes) => bytes,
        None => {
            tracing::warn!(value = %raw, default = DEFAULT_PAYLOAD_LIMIT, "Invalid payload limit, using default");
            DEFAULT_PAYLOAD_LIMIT
        }
    }
}

fn parse_byte_size(raw: &str) -> Option<usize> {
    let normalized = raw.trim().to_ascii_lowercase();
    let split = normalized
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit.trim() {
        "" | "b" => 1.0,
        "kb" | "k" => 1024.0,
        "mb" | "m" => 1024.0 * 1024.0,
        "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    let bytes = (number * multiplier).floor();
    if !bytes.is_finite() || bytes < 1.0 || bytes > usize::MAX as f64 {
        return None;
    }
    Some(bytes as usize)
}
