//! Project manifest parsing
//!
//! Every project and every dependency tree has a `depvault.toml` manifest.
//! The cache only requires its presence in dependency trees; projects use it
//! to describe how their dependencies are configured.

use crate::cache::key::{BuildConfig, BuildProfile, ConfigValue};
use crate::error::{DepvaultError, DepvaultResult};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Parsed `depvault.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Package metadata
    pub package: PackageMeta,

    /// Build settings applied to every dependency
    #[serde(default)]
    pub build: BuildSection,

    /// Per-dependency configuration
    #[serde(default)]
    pub configuration: ConfigurationSection,
}

/// Package metadata section
#[derive(Debug, Clone, Deserialize)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
}

/// Build section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Profile for dependencies without an override
    pub profile: BuildProfile,

    /// Target environment facts
    pub environment: BTreeMap<String, String>,

    /// Per-dependency profile overrides
    pub profiles: BTreeMap<String, BuildProfile>,
}

/// Configuration section
///
/// ```toml
/// [configuration.values.hello]
/// max_depth = 8
///
/// [configuration.features]
/// hello = ["tls"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigurationSection {
    /// Variable values keyed by dependency name
    pub values: BTreeMap<String, BTreeMap<String, ConfigValue>>,

    /// Enabled features keyed by dependency name
    pub features: BTreeMap<String, BTreeSet<String>>,
}

impl Manifest {
    /// Parse a manifest from a TOML file on disk
    pub async fn from_file(path: &Path) -> DepvaultResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DepvaultError::io(format!("reading manifest {}", path.display()), e))?;
        Self::parse(&content).map_err(|e| match e {
            DepvaultError::ManifestInvalid { reason, .. } => DepvaultError::ManifestInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a manifest from a TOML string
    pub fn parse(content: &str) -> DepvaultResult<Self> {
        toml::from_str(content).map_err(|e| DepvaultError::ManifestInvalid {
            path: "depvault.toml".into(),
            reason: e.to_string(),
        })
    }

    /// Build configuration the project applies to dependency `name`
    pub fn build_config_for(&self, name: &str) -> BuildConfig {
        BuildConfig {
            profile: self
                .build
                .profiles
                .get(name)
                .copied()
                .unwrap_or(self.build.profile),
            environment: self.build.environment.clone(),
            features: self
                .configuration
                .features
                .get(name)
                .cloned()
                .unwrap_or_default(),
            variables: self
                .configuration
                .values
                .get(name)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
