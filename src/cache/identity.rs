//! Resolved dependency identities
//!
//! A [`DependencyIdentity`] (name, version, origin kind) uniquely determines a
//! vault slot. Identities arrive already resolved; nothing here selects
//! versions.

use crate::error::{DepvaultError, DepvaultResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length of a dependency name
const MAX_NAME_LEN: usize = 64;

/// Where a dependency's sources come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// A directory on the local filesystem
    Filesystem,
    /// A git repository at a pinned commit
    Git,
    /// A Mercurial repository at a pinned changeset
    Hg,
    /// A Subversion repository at a pinned revision
    Svn,
    /// A source archive (tarball, zip)
    Archive,
    /// A package registry
    Registry,
}

impl OriginKind {
    /// Lowercase name used in entry directory names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Svn => "svn",
            Self::Archive => "archive",
            Self::Registry => "registry",
        }
    }

    /// All origin kinds
    pub fn all() -> &'static [Self] {
        &[
            Self::Filesystem,
            Self::Git,
            Self::Hg,
            Self::Svn,
            Self::Archive,
            Self::Registry,
        ]
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginKind {
    type Err = DepvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DepvaultError::InvalidIdentity(format!("unknown origin kind '{}'", s)))
    }
}

/// A resolved dependency: name, exact version and origin kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyIdentity {
    name: String,
    version: Version,
    origin: OriginKind,
}

impl DependencyIdentity {
    /// Create an identity, validating the name
    pub fn new(name: impl Into<String>, version: Version, origin: OriginKind) -> DepvaultResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            version,
            origin,
        })
    }

    /// Parse an identity from its textual parts
    pub fn parse(name: &str, version: &str, origin: &str) -> DepvaultResult<Self> {
        let version = Version::parse(version).map_err(|e| {
            DepvaultError::InvalidIdentity(format!("invalid version '{}' for {}: {}", version, name, e))
        })?;
        Self::new(name, version, origin.parse()?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn origin(&self) -> OriginKind {
        self.origin
    }

    /// Directory name of this identity's vault entry: `<name>_<version>_<origin>`
    pub fn vault_dir_name(&self) -> String {
        format!("{}_{}_{}", self.name, self.version, self.origin)
    }
}

impl fmt::Display for DependencyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.name, self.version, self.origin)
    }
}

/// Validate that a dependency name is safe to use as a path component.
fn validate_name(name: &str) -> DepvaultResult<()> {
    if name.is_empty() {
        return Err(DepvaultError::InvalidIdentity(
            "dependency name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DepvaultError::InvalidIdentity(format!(
            "dependency name '{}' is longer than {} characters",
            name, MAX_NAME_LEN
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(DepvaultError::InvalidIdentity(format!(
            "dependency name '{}' must start with a lowercase letter",
            name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DepvaultError::InvalidIdentity(format!(
            "dependency name '{}' must contain only lowercase letters, digits, or underscores",
            name
        )));
    }
    Ok(())
}
