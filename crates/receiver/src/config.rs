use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReceiverError;

pub const DEFAULT_PORT: u16 = 8022;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 500;
pub const DEFAULT_TIMESTAMP_LIMIT: u64 = 300;

/// Receiver settings, read from a JSON file and then overridden from the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub host: String,
    pub port: u16,
    /// Path key → base directory.
    pub paths: BTreeMap<String, PathBuf>,
    pub max_upload_mb: u64,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Hex-encoded Ed25519 public key. The receiver never holds a private key.
    pub public_key: String,
    /// Freshness window in seconds.
    pub timestamp_limit: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            paths: BTreeMap::new(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            security: SecurityConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            timestamp_limit: DEFAULT_TIMESTAMP_LIMIT,
        }
    }
}

impl ReceiverConfig {
    pub fn load(path: &Path) -> Result<Self, ReceiverError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReceiverError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ReceiverError> {
        serde_json::from_str(raw).map_err(|e| ReceiverError::Config(format!("invalid config JSON: {e}")))
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}
