//! Configuration management for depvault

pub mod schema;

pub use schema::Config;

use crate::error::{DepvaultError, DepvaultResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project-local config file name, discovered by walking up from the cwd
pub const LOCAL_CONFIG_NAME: &str = ".depvault.toml";

/// Keys accepted by `config set`
pub const VALID_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "dependencies.shared",
    "dependencies.dir",
    "dependencies.index",
    "cache.lock_timeout_secs",
];

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depvault")
            .join("config.toml")
    }

    /// Find `.depvault.toml` in `start` or its nearest ancestor
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .find(|path| path.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> DepvaultResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> DepvaultResult<Config> {
        let value = read_toml(path).await?;
        value.try_into().map_err(|e: toml::de::Error| DepvaultError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config with a local config merged over it
    ///
    /// Keys present in the local file win; tables are merged key by key.
    pub async fn load_merged(&self, local: Option<&Path>) -> DepvaultResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut merged = if self.config_path.exists() {
            read_toml(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };
        merge_toml(&mut merged, read_toml(local).await?);

        merged.try_into().map_err(|e: toml::de::Error| DepvaultError::ConfigInvalid {
            path: local.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DepvaultResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            DepvaultError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set one dotted key in the config file, keeping everything else as written
    pub async fn set_value(&self, key: &str, value: &str) -> DepvaultResult<()> {
        self.ensure_config_dir().await?;
        set_value_in_file(&self.config_path, key, value).await
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> DepvaultResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DepvaultError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_toml(path: &Path) -> DepvaultResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| DepvaultError::io(format!("reading config from {}", path.display()), e))?;
    toml::from_str::<toml::Table>(&content)
        .map(toml::Value::Table)
        .map_err(|e| DepvaultError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Merge `overlay` into `base`, recursing into tables
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Set a dotted key in a TOML file with `toml_edit`, creating the file and
/// intermediate tables as needed.
pub async fn set_value_in_file(path: &Path, key: &str, value: &str) -> DepvaultResult<()> {
    validate_key(key)?;

    let content = if path.exists() {
        fs::read_to_string(path)
            .await
            .map_err(|e| DepvaultError::io(format!("reading {}", path.display()), e))?
    } else {
        String::new()
    };

    let mut doc: toml_edit::DocumentMut = content.parse()?;
    let (tables, leaf) = match key.rsplit_once('.') {
        Some((tables, leaf)) => (tables.split('.').collect::<Vec<_>>(), leaf),
        None => (Vec::new(), key),
    };

    let mut table = doc.as_table_mut();
    for part in tables {
        table = table
            .entry(part)
            .or_insert_with(toml_edit::table)
            .as_table_mut()
            .ok_or_else(|| DepvaultError::User(format!("Expected table at key: {}", part)))?;
    }
    table.insert(leaf, toml_edit::value(typed_value(key, value)?));

    fs::write(path, doc.to_string())
        .await
        .map_err(|e| DepvaultError::io(format!("writing {}", path.display()), e))?;
    debug!("Set {} = {} in {}", key, value, path.display());
    Ok(())
}

fn validate_key(key: &str) -> DepvaultResult<()> {
    if VALID_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(DepvaultError::User(format!("Unknown config key: {}", key)))
    }
}

fn typed_value(key: &str, value: &str) -> DepvaultResult<toml_edit::Value> {
    match key {
        "general.verbose" | "dependencies.shared" => Ok(parse_bool(value)?.into()),
        "cache.lock_timeout_secs" => value
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(toml_edit::Value::from)
            .ok_or_else(|| DepvaultError::User(format!("Invalid number: {}", value))),
        "general.log_format" if value != "text" && value != "json" => Err(DepvaultError::User(
            format!("Invalid log format: {}. Use text or json", value),
        )),
        _ => Ok(value.into()),
    }
}

fn parse_bool(value: &str) -> DepvaultResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(DepvaultError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}
