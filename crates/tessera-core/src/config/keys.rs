//! Key ring configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for locating symmetric key material.
///
/// Sources are consulted in order: `key_repository`, then `keys_env`, then
/// `keys_file`. The first source that yields anything wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRingConfig {
    /// Directory of integer-named key files. The highest index is primary.
    #[serde(default)]
    pub key_repository: Option<PathBuf>,

    /// Environment variable holding comma-separated base64url keys, primary first.
    #[serde(default = "default_keys_env")]
    pub keys_env: Option<String>,

    /// File holding one base64url key per line, primary first.
    #[serde(default)]
    pub keys_file: Option<PathBuf>,
}

impl Default for KeyRingConfig {
    fn default() -> Self {
        Self {
            key_repository: None,
            keys_env: default_keys_env(),
            keys_file: None,
        }
    }
}

impl KeyRingConfig {
    /// Resolve encoded keys from the environment variable or the keys file.
    ///
    /// The first source that yields at least one key wins; an empty variable
    /// falls through to the file. Returns `None` when neither source yields keys.
    /// The key repository is not read here; it is a directory and is loaded by
    /// the token crate.
    pub fn resolve_encoded_keys(&self) -> Result<Option<Vec<String>>, std::io::Error> {
        if let Some(env_var) = &self.keys_env {
            if let Ok(value) = std::env::var(env_var) {
                let keys = split_keys(&value, ',');
                if !keys.is_empty() {
                    return Ok(Some(keys));
                }
            }
        }

        if let Some(path) = &self.keys_file {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let keys = split_keys(&content, '\n');
                if !keys.is_empty() {
                    return Ok(Some(keys));
                }
            }
        }

        Ok(None)
    }
}

fn split_keys(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_keys_env() -> Option<String> {
    Some("TESSERA_KEYS".to_string())
}
