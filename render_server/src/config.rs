//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden by the
//! `LISTENING_PORT` environment variable and finally by the command line.

use frame_bridge::config::{Config, ConfigError};
use frame_bridge::RenderConfig;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`ServerConfig::listening_port`]
pub const PORT_ENV_VAR: &str = "LISTENING_PORT";

/// Port used when neither file, environment nor flag sets one
pub const DEFAULT_PORT: u16 = 8080;

/// Everything the server needs to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind_address: String,
    /// TCP port to listen on
    pub listening_port: u16,
    /// Worker thread count; actix picks one per core when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Render path settings
    pub render: RenderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            listening_port: DEFAULT_PORT,
            workers: None,
            log_filter: "info".to_string(),
            render: RenderConfig::default(),
        }
    }
}

impl Config for ServerConfig {}

impl ServerConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_port_override(std::env::var(PORT_ENV_VAR).ok().as_deref())
    }

    /// Apply a `LISTENING_PORT` value, if present
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        self.listening_port = value.parse().map_err(|_| ConfigError::Invalid {
            field: "listening_port",
            reason: format!("{PORT_ENV_VAR}={value:?} is not a port number"),
        })?;
        Ok(())
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "bind_address",
                reason: "must not be empty".to_string(),
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        self.render.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_bridge::TransferStrategy;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.listening_port, 8080);
        assert_eq!(config.workers, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = ServerConfig::from_toml(
            r#"
listening_port = 9000
workers = 4

[render]
transfer = "prefer-bulk"
"#,
        )
        .unwrap();

        assert_eq!(config.listening_port, 9000);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.render.transfer, TransferStrategy::PreferBulk);
    }

    #[test]
    fn test_port_override() {
        let mut config = ServerConfig::default();
        config.apply_port_override(Some("3000")).unwrap();
        assert_eq!(config.listening_port, 3000);

        config.apply_port_override(None).unwrap();
        config.apply_port_override(Some("  ")).unwrap();
        assert_eq!(config.listening_port, 3000);
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = ServerConfig::default();
        for value in ["http", "70000", "-1"] {
            assert!(matches!(
                config.apply_port_override(Some(value)),
                Err(ConfigError::Invalid { field: "listening_port", .. })
            ));
        }
        assert_eq!(config.listening_port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ServerConfig {
            workers: Some(0),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let config = ServerConfig {
            listening_port: 7070,
            workers: Some(2),
            ..ServerConfig::default()
        };

        config.save_to_file(&path).unwrap();
        assert_eq!(ServerConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            ServerConfig::load_from_file("server.json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
