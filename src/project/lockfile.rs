//! Project lockfile
//!
//! `depvault.lock` pins the resolved dependencies of a project. Resolution
//! itself happens elsewhere; this module only reads the result.
//!
//! ```toml
//! [[dependency]]
//! name = "hello"
//! version = "1.0.1"
//! origin = "filesystem"
//! ```

use crate::cache::identity::{DependencyIdentity, OriginKind};
use crate::error::{DepvaultError, DepvaultResult};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Lockfile name at the project root
pub const LOCKFILE_NAME: &str = "depvault.lock";

/// Parsed `depvault.lock`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lockfile {
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<LockedDependency>,
}

/// One pinned dependency
#[derive(Debug, Clone, Deserialize)]
pub struct LockedDependency {
    pub name: String,
    pub version: String,
    #[serde(default = "default_origin")]
    pub origin: OriginKind,
}

fn default_origin() -> OriginKind {
    OriginKind::Filesystem
}

impl Lockfile {
    /// Load the lockfile of a project, empty if the project has none
    pub async fn load(project_root: &Path) -> DepvaultResult<Self> {
        let path = project_root.join(LOCKFILE_NAME);
        if !path.exists() {
            debug!("No lockfile at {}", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DepvaultError::io(format!("reading lockfile {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| DepvaultError::ManifestInvalid {
            path,
            reason: e.to_string(),
        })
    }

    /// Validated identities of all pinned dependencies, in lockfile order
    pub fn identities(&self) -> DepvaultResult<Vec<DependencyIdentity>> {
        self.dependencies
            .iter()
            .map(|dep| {
                DependencyIdentity::parse(&dep.name, &dep.version, dep.origin.as_str())
            })
            .collect()
    }
}
