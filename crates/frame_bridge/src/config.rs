//! Configuration system
//!
//! [`Config`] gives any serde type file loading and saving; [`RenderConfig`]
//! holds the knobs of the render path itself.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::encode::PngCompression;
use crate::marshal::TransferStrategy;

/// Default per-side frame limit
pub const DEFAULT_MAX_FRAME_DIMENSION: u32 = 16_384;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !is_toml(path) {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if !is_toml(path) {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but is not usable
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings for the render path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// How pixels cross the native boundary
    pub transfer: TransferStrategy,
    /// PNG compression level
    pub compression: PngCompression,
    /// Largest accepted frame side; bigger frames are a contract violation
    pub max_frame_dimension: u32,
}

impl RenderConfig {
    /// Reject settings the render path cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_dimension == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frame_dimension",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            transfer: TransferStrategy::default(),
            compression: PngCompression::default(),
            max_frame_dimension: DEFAULT_MAX_FRAME_DIMENSION,
        }
    }
}

impl Config for RenderConfig {}
