//! Projects: a directory with a `depvault.toml` manifest and a lockfile

pub mod lockfile;
pub mod manifest;

pub use lockfile::{LockedDependency, Lockfile, LOCKFILE_NAME};
pub use manifest::Manifest;

use crate::cache::MANIFEST_FILE;
use crate::error::{DepvaultError, DepvaultResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded project
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: Manifest,
    pub lockfile: Lockfile,
}

impl Project {
    /// Find the nearest directory at or above `start` holding a manifest
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILE).is_file())
            .map(Path::to_path_buf)
    }

    /// Load the project containing `start`
    pub async fn discover(start: &Path) -> DepvaultResult<Self> {
        let root =
            Self::find_root(start).ok_or_else(|| DepvaultError::ProjectNotFound(start.to_path_buf()))?;
        debug!("Project root: {}", root.display());
        Self::load(&root).await
    }

    /// Load the project rooted at `root`
    pub async fn load(root: &Path) -> DepvaultResult<Self> {
        let manifest = Manifest::from_file(&root.join(MANIFEST_FILE)).await?;
        let lockfile = Lockfile::load(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            lockfile,
        })
    }
}
