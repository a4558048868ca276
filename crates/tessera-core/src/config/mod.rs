//! Configuration types for Tessera.
//!
//! # Configuration File
//!
//! ```yaml
//! keys:
//!   key_repository: /etc/tessera/keys
//!   keys_env: TESSERA_KEYS
//! tokens:
//!   default_lifetime: 1h
//!   methods: [password, token]
//! ```

pub mod keys;
pub mod token;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use keys::KeyRingConfig;
pub use token::{TokenConfig, parse_duration};

/// Complete Tessera configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseraConfig {
    /// Where symmetric key material is loaded from.
    #[serde(default)]
    pub keys: KeyRingConfig,

    /// Token issuance defaults.
    #[serde(default)]
    pub tokens: TokenConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },
}

impl TesseraConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}
