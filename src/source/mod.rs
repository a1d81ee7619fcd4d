//! Dependency source fetching
//!
//! The cache never talks to a network or a version control system itself. It
//! asks a [`SourceFetcher`] to populate a staging directory with the tree of
//! one resolved dependency, then takes care of atomic publication.

use crate::cache::fsops;
use crate::cache::identity::{DependencyIdentity, OriginKind};
use crate::cache::METADATA_DIR;
use crate::error::{DepvaultError, DepvaultResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces the source tree of a resolved dependency
///
/// Implementations write into `dest`, an empty directory owned by the caller.
/// A partially written `dest` is discarded by the caller on error.
pub trait SourceFetcher: Send + Sync {
    /// Populate `dest` with the tree of `identity`
    fn fetch(&self, identity: &DependencyIdentity, dest: &Path) -> DepvaultResult<()>;

    /// Human-readable fetcher name for display
    fn name(&self) -> &'static str;
}

/// Serves dependencies from a local index laid out as `<index>/<name>/<version>/`
///
/// Only `filesystem` origins are served. A top-level `depvault/` directory in
/// the indexed tree is tool state of that tree and is not copied.
#[derive(Debug, Clone)]
pub struct FilesystemFetcher {
    index_root: PathBuf,
}

impl FilesystemFetcher {
    pub fn new(index_root: impl Into<PathBuf>) -> Self {
        Self {
            index_root: index_root.into(),
        }
    }

    pub fn index_root(&self) -> &Path {
        &self.index_root
    }

    /// Directory holding the tree of `identity` in the index
    pub fn source_dir(&self, identity: &DependencyIdentity) -> PathBuf {
        self.index_root
            .join(identity.name())
            .join(identity.version().to_string())
    }
}

impl SourceFetcher for FilesystemFetcher {
    fn fetch(&self, identity: &DependencyIdentity, dest: &Path) -> DepvaultResult<()> {
        if identity.origin() != OriginKind::Filesystem {
            return Err(DepvaultError::fetch(
                identity,
                format!("origin '{}' is not served by the filesystem index", identity.origin()),
            ));
        }

        let source = self.source_dir(identity);
        if !source.is_dir() {
            return Err(DepvaultError::fetch(
                identity,
                format!("not found in index at {}", source.display()),
            ));
        }

        let copied = fsops::copy_tree(&source, dest, &[METADATA_DIR])?;
        debug!("Fetched {} files for {} from {}", copied, identity, source.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem index"
    }
}
