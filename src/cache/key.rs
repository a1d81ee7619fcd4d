//! Build configuration and hash-keyed build cache keys
//!
//! A [`BuildKey`] identifies one build cache entry. Its hash is the SHA-256 of
//! a canonical JSON document describing the dependency identity and every
//! semantically relevant part of its [`BuildConfig`]:
//!
//! ```text
//! {"format":1,"name":..,"version":..,"origin":..,"profile":..,
//!  "environment":{sorted},"features":[sorted],"variables":{sorted}}
//! ```
//!
//! Identity fields are separate JSON members, so a name containing `_` can
//! never alias another identity. Collections are ordered maps and sets, so
//! the order in which options were supplied does not affect the key.

use crate::cache::identity::{DependencyIdentity, OriginKind};
use crate::error::{DepvaultError, DepvaultResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Version of the canonical key document. Bump when its shape changes.
const KEY_FORMAT_VERSION: u32 = 1;

/// Build profile applied to a dependency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Release,
    Validation,
    #[default]
    Development,
}

impl BuildProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Validation => "validation",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildProfile {
    type Err = DepvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(Self::Release),
            "validation" => Ok(Self::Validation),
            "development" => Ok(Self::Development),
            other => Err(DepvaultError::User(format!(
                "Invalid build profile '{}'. Use release, validation or development",
                other
            ))),
        }
    }
}

/// Typed value of a configuration variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl ConfigValue {
    /// Parse a command-line value: booleans and integers are recognised,
    /// anything else is a string.
    pub fn parse_loose(value: &str) -> Self {
        match value {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => value
                .parse::<i64>()
                .map(Self::Integer)
                .unwrap_or_else(|_| Self::String(value.to_string())),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

/// Build configuration applied to one dependency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build profile
    pub profile: BuildProfile,

    /// Target environment facts (os, arch, toolchain, ...)
    pub environment: BTreeMap<String, String>,

    /// Enabled features
    pub features: BTreeSet<String>,

    /// Configuration variable values
    pub variables: BTreeMap<String, ConfigValue>,
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: BuildProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// Canonical document hashed into a build key
#[derive(Serialize)]
struct CanonicalKey<'a> {
    format: u32,
    name: &'a str,
    version: String,
    origin: OriginKind,
    profile: BuildProfile,
    environment: &'a BTreeMap<String, String>,
    features: &'a BTreeSet<String>,
    variables: &'a BTreeMap<String, CanonicalValue<'a>>,
}

/// Variables are tagged with their type so `"1"` and `1` hash differently
#[derive(Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum CanonicalValue<'a> {
    Bool(bool),
    Integer(i64),
    String(&'a str),
}

impl<'a> From<&'a ConfigValue> for CanonicalValue<'a> {
    fn from(value: &'a ConfigValue) -> Self {
        match value {
            ConfigValue::Bool(b) => Self::Bool(*b),
            ConfigValue::Integer(n) => Self::Integer(*n),
            ConfigValue::String(s) => Self::String(s),
        }
    }
}

/// Structured key of a build cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    identity: DependencyIdentity,
    hash: String,
}

impl BuildKey {
    pub fn identity(&self) -> &DependencyIdentity {
        &self.identity
    }

    /// Full lowercase hex SHA-256 of the canonical key document
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Directory name of the build entry: `<name>_<version>_<origin>_<hash>`
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.identity.vault_dir_name(), self.hash)
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.identity, &self.hash[..12])
    }
}

/// Compute the build key for a dependency under a build configuration.
///
/// Pure and deterministic: equal inputs always produce equal keys.
pub fn key(identity: &DependencyIdentity, config: &BuildConfig) -> DepvaultResult<BuildKey> {
    let bytes = canonical_bytes(identity, config)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let hash = hex::encode(hasher.finalize());

    Ok(BuildKey {
        identity: identity.clone(),
        hash,
    })
}

fn canonical_bytes(identity: &DependencyIdentity, config: &BuildConfig) -> DepvaultResult<Vec<u8>> {
    let variables: BTreeMap<String, CanonicalValue<'_>> = config
        .variables
        .iter()
        .map(|(name, value)| (name.clone(), CanonicalValue::from(value)))
        .collect();

    let doc = CanonicalKey {
        format: KEY_FORMAT_VERSION,
        name: identity.name(),
        version: identity.version().to_string(),
        origin: identity.origin(),
        profile: config.profile,
        environment: &config.environment,
        features: &config.features,
        variables: &variables,
    };

    Ok(serde_json::to_vec(&doc)?)
}
