//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::{FileSettings, FlightConfig};
use crate::config::validation::resolve;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Load the optional TOML settings file.
pub fn load_file_settings(path: &Path) -> Result<FileSettings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Build the runtime configuration for this process.
///
/// The config file, when named, must exist and parse; everything else falls
/// back to defaults.
pub fn load_config(cli: &Cli, available_cores: usize) -> Result<FlightConfig, ConfigError> {
    let file = match &cli.config {
        Some(path) => {
            let settings = load_file_settings(path)?;
            tracing::debug!(path = ?path, "Config file loaded");
            settings
        }
        None => FileSettings::default(),
    };

    Ok(resolve(cli, file, available_cores))
}

/// CPU cores visible to this process.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            mode = "development"
            port = 4100
            cookie_name = "sid"

            [cache]
            ttl_secs = 5
            "#
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = load_config(&cli, 2).unwrap();
        assert!(!config.mode.is_production());
        assert_eq!(config.listener.port, 4100);
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.cache.ttl_secs, 5);
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some("/definitely/not/here/flight.toml".into()),
            ..Default::default()
        };
        assert!(matches!(load_config(&cli, 1), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = [").unwrap();
        let err = load_file_settings(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
