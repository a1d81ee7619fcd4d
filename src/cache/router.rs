//! Vault and build cache root selection
//!
//! # Layout
//!
//! | Mode | Vault | Builds |
//! |------|-------|--------|
//! | Shared | `<shared>/vault` | `<shared>/builds` |
//! | Local | `<project>/depvault/cache/vault` | `<project>/depvault/cache/builds` |
//!
//! In shared mode the project-local cache directory is never created. One
//! left over from earlier local-mode work is reported by
//! [`WorkspaceRouter::stray_project_cache`].

use crate::cache::METADATA_DIR;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where vault and build entries live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingMode {
    /// Per project, under `<project>/depvault/cache`
    #[default]
    Local,
    /// One root for every project of the user
    Shared,
}

impl SharingMode {
    pub fn from_flag(shared: bool) -> Self {
        if shared {
            Self::Shared
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for SharingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// Which of the two cache tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Vault,
    Builds,
}

impl RootKind {
    fn dir_name(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Builds => "builds",
        }
    }
}

/// Decides the roots cache work runs under
#[derive(Debug, Clone)]
pub struct WorkspaceRouter {
    mode: SharingMode,
    shared_root: PathBuf,
    project_root: PathBuf,
}

impl WorkspaceRouter {
    pub fn new(
        mode: SharingMode,
        shared_root: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            shared_root: shared_root.into(),
            project_root: project_root.into(),
        }
    }

    /// Default shared root: `<user cache dir>/depvault`
    pub fn default_shared_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depvault")
    }

    pub fn mode(&self) -> SharingMode {
        self.mode
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Root directory for one tier under the current mode
    pub fn root_for(&self, kind: RootKind) -> PathBuf {
        match self.mode {
            SharingMode::Shared => self.shared_root.join(kind.dir_name()),
            SharingMode::Local => self.project_cache_dir().join(kind.dir_name()),
        }
    }

    /// The project-local cache directory: `<project>/depvault/cache`
    pub fn project_cache_dir(&self) -> PathBuf {
        self.project_root.join(METADATA_DIR).join("cache")
    }

    /// In shared mode, an existing project-local cache directory
    pub fn stray_project_cache(&self) -> Option<PathBuf> {
        if self.mode != SharingMode::Shared {
            return None;
        }
        let dir = self.project_cache_dir();
        dir.exists().then_some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn shared_roots() {
        let router = WorkspaceRouter::new(SharingMode::Shared, "/srv/dv", "/work/app");
        assert_eq!(router.root_for(RootKind::Vault), PathBuf::from("/srv/dv/vault"));
        assert_eq!(router.root_for(RootKind::Builds), PathBuf::from("/srv/dv/builds"));
    }

    #[test]
    fn local_roots() {
        let router = WorkspaceRouter::new(SharingMode::Local, "/srv/dv", "/work/app");
        assert_eq!(
            router.root_for(RootKind::Vault),
            PathBuf::from("/work/app/depvault/cache/vault")
        );
        assert_eq!(
            router.root_for(RootKind::Builds),
            PathBuf::from("/work/app/depvault/cache/builds")
        );
    }

    #[test]
    fn stray_cache_only_reported_in_shared_mode() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("app");
        fs::create_dir_all(project.join("depvault").join("cache")).unwrap();

        let shared = WorkspaceRouter::new(SharingMode::Shared, temp.path().join("s"), &project);
        let local = WorkspaceRouter::new(SharingMode::Local, temp.path().join("s"), &project);

        assert_eq!(
            shared.stray_project_cache(),
            Some(project.join("depvault").join("cache"))
        );
        assert_eq!(local.stray_project_cache(), None);
    }

    #[test]
    fn no_stray_cache_when_absent() {
        let temp = TempDir::new().unwrap();
        let router = WorkspaceRouter::new(SharingMode::Shared, temp.path().join("s"), temp.path());
        assert!(router.stray_project_cache().is_none());
    }

    #[test]
    fn default_shared_root_ends_with_tool_name() {
        assert!(WorkspaceRouter::default_shared_root().ends_with("depvault"));
    }
}
