//! Configuration schema for depvault
//!
//! Configuration is stored at `~/.config/depvault/config.toml`, with optional
//! project-local overrides in `.depvault.toml`.

use crate::cache::router::SharingMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Dependency storage settings
    pub dependencies: DependenciesConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

impl Config {
    /// Sharing mode requested by `dependencies.shared`
    pub fn sharing_mode(&self) -> SharingMode {
        SharingMode::from_flag(self.dependencies.shared)
    }

    /// Lock acquisition timeout for cache writers
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.cache.lock_timeout_secs)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Dependency storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Store vault and build entries under one root shared by all projects
    pub shared: bool,

    /// Shared root (default: `<user cache dir>/depvault`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Local index that dependency sources are fetched from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a writer waits for an entry lock before giving up
    pub lock_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: 120,
        }
    }
}
