//! Configuration schema definitions.
//!
//! `FlightConfig` is the fully resolved record every process works from.
//! `FileSettings` is the optional TOML layer; its fields are all optional so
//! that a minimal file only names what it overrides.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_DURATION_MS: u64 = 86_400_000;
pub const DEFAULT_PAYLOAD_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_VITE_PORT: u16 = 3001;
pub const DEFAULT_COOKIE_NAME: &str = "flightApp";
pub const DEFAULT_APP_KEY: &str = "//input example secret key//";
pub const DEFAULT_DIST_PATH: &str = "../dist";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Sometimes You Just Have to Slow Down.";

/// Which pipeline a worker builds and which Vite command the primary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration for a Flight process.
#[derive(Debug, Clone)]
pub struct FlightConfig {
    /// Absolute application home. Discovery and relative paths start here.
    pub app_home: PathBuf,

    pub mode: Mode,

    pub listener: ListenerConfig,

    pub session: SessionConfig,

    pub redis: RedisConfig,

    /// Number of worker processes the primary keeps alive.
    pub worker_count: usize,

    pub frontend: FrontendConfig,

    pub limits: LimitsConfig,

    pub rate_limit: RateLimitConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

impl FlightConfig {
    /// Resolve a possibly relative path against the application home.
    pub fn home_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_home.join(path)
        }
    }

    /// Directory holding the production SPA build.
    pub fn dist_dir(&self) -> PathBuf {
        self.home_relative(&self.frontend.dist_path)
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            app_home: PathBuf::from("."),
            mode: Mode::default(),
            listener: ListenerConfig::default(),
            session: SessionConfig::default(),
            redis: RedisConfig::default(),
            worker_count: 1,
            frontend: FrontendConfig::default(),
            limits: LimitsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration shared by every worker.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

/// Cookie session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app_key: String,
    pub app_secret: String,
    pub cookie_name: String,
    /// Cookie lifetime in milliseconds. Zero means a browser-session cookie.
    pub max_age_ms: u64,
}

impl SessionConfig {
    /// True when the signing key is still the shipped placeholder.
    pub fn uses_default_key(&self) -> bool {
        self.app_key == DEFAULT_APP_KEY && self.app_secret.is_empty()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_key: DEFAULT_APP_KEY.to_string(),
            app_secret: String::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_ms: DEFAULT_SESSION_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
        }
    }
}

/// Vite integration.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Skip running Vite entirely (no build, no dev server, no dev proxy).
    pub vite_disabled: bool,
    /// Build output served in production, relative to app home unless absolute.
    pub dist_path: PathBuf,
    /// Port of the Vite dev server in development mode.
    pub dev_port: u16,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            vite_disabled: false,
            dist_path: PathBuf::from(DEFAULT_DIST_PATH),
            dev_port: DEFAULT_VITE_PORT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub payload_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Fixed-window rate limiting, per client IP.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max: u64,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Body of the 429 response.
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: 100,
            window_ms: 60_000,
            message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
        }
    }
}

/// Response cache in front of the static build.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Prometheus scrape address for the primary; disabled when unset.
    pub metrics_address: Option<SocketAddr>,
}

/// Optional TOML configuration file.
///
/// Keys mirror the CLI flag names. Numeric fields are kept loosely typed so
/// that invalid values go through the same warn-and-default path as flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileSettings {
    pub app_home: Option<PathBuf>,
    pub mode: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub cookie_name: Option<String>,
    pub session_duration: Option<toml::Value>,
    pub host: Option<String>,
    pub port: Option<toml::Value>,
    pub payload_limit: Option<toml::Value>,
    pub request_timeout: Option<toml::Value>,
    pub redis_host: Option<String>,
    pub redis_port: Option<toml::Value>,
    pub max_workers: Option<toml::Value>,
    pub disable_vite: Option<toml::Value>,
    pub dist_path: Option<PathBuf>,
    pub vite_port: Option<toml::Value>,
    pub metrics_address: Option<String>,

    pub rate_limit: RateLimitConfig,

    pub cache: CacheConfig,
}
