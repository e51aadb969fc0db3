use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{KeySize, SecretKey};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid identity key: {0}")]
    InvalidKey(String),
    #[error("no identity key configured")]
    NoIdentity,
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Content key distribution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DskConfig {
    /// Lifetime of a single DSK request, in milliseconds
    #[serde(default = "default_interest_lifetime_ms")]
    pub interest_lifetime_ms: u64,
    /// Total number of request attempts before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Freshness period of a DSK response, in seconds
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Longest requester public key a responder will answer
    #[serde(default = "default_max_peer_key_len")]
    pub max_peer_key_len: usize,
    /// Size of the key derived to wrap the content key (16 or 32)
    #[serde(default)]
    pub wrap_key_size: KeySize,
}

fn default_interest_lifetime_ms() -> u64 {
    2000
}

fn default_attempts() -> u32 {
    3
}

fn default_freshness_secs() -> u64 {
    60
}

fn default_max_peer_key_len() -> usize {
    64
}

impl Default for DskConfig {
    fn default() -> Self {
        Self {
            interest_lifetime_ms: default_interest_lifetime_ms(),
            attempts: default_attempts(),
            freshness_secs: default_freshness_secs(),
            max_peer_key_len: default_max_peer_key_len(),
            wrap_key_size: KeySize::default(),
        }
    }
}

impl DskConfig {
    pub fn interest_lifetime(&self) -> Duration {
        Duration::from_millis(self.interest_lifetime_ms)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

/// Log snapshot settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Number of un-snapshotted entries that triggers compaction
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

fn default_threshold() -> usize {
    10
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// PEM file holding the member's Ed25519 identity key
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dsk: DskConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_toml = fs::read_to_string(path)?;
        Self::from_toml_str(&config_toml)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let config_toml = toml::to_string_pretty(self)?;
        fs::write(path, config_toml)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dsk.attempts == 0 {
            return Err(ConfigError::Invalid("dsk.attempts must be at least 1"));
        }
        if self.dsk.interest_lifetime_ms == 0 {
            return Err(ConfigError::Invalid("dsk.interest_lifetime_ms must be positive"));
        }
        if self.snapshot.threshold == 0 {
            return Err(ConfigError::Invalid("snapshot.threshold must be positive"));
        }
        Ok(())
    }

    /// Load the identity key named by `identity.key_path`
    pub fn load_identity(&self) -> Result<SecretKey, ConfigError> {
        let path = self.identity.key_path.as_ref().ok_or(ConfigError::NoIdentity)?;
        let pem = fs::read_to_string(path)?;
        SecretKey::from_pem(&pem).map_err(|e| ConfigError::InvalidKey(e.to_string()))
    }
}
