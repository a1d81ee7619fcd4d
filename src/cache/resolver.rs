//! Build directory resolution
//!
//! [`BuildDirectoryResolver::get_build_directory`] is the single entry point
//! build tooling uses: it ensures the vault entry, computes the build key and
//! materializes the build entry, all under the roots chosen by the
//! [`WorkspaceRouter`].

use crate::cache::identity::DependencyIdentity;
use crate::cache::key::{self, BuildConfig};
use crate::cache::materialize::BuildMaterializer;
use crate::cache::router::{RootKind, WorkspaceRouter};
use crate::cache::vault::ContentStore;
use crate::error::DepvaultResult;
use crate::generate::ConfigGenerator;
use crate::source::SourceFetcher;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves dependency identities to build directories
pub struct BuildDirectoryResolver {
    router: WorkspaceRouter,
    vault: ContentStore,
    builds: BuildMaterializer,
    fetcher: Box<dyn SourceFetcher>,
    generator: Box<dyn ConfigGenerator>,
    stray_reported: AtomicBool,
}

impl BuildDirectoryResolver {
    pub fn new(
        router: WorkspaceRouter,
        fetcher: Box<dyn SourceFetcher>,
        generator: Box<dyn ConfigGenerator>,
        lock_timeout: Duration,
    ) -> Self {
        let vault = ContentStore::new(router.root_for(RootKind::Vault), lock_timeout);
        let builds = BuildMaterializer::new(router.root_for(RootKind::Builds), lock_timeout);
        Self {
            router,
            vault,
            builds,
            fetcher,
            generator,
            stray_reported: AtomicBool::new(false),
        }
    }

    /// Vault entry for `identity`, fetching it if needed
    pub fn ensure_vault(&self, identity: &DependencyIdentity) -> DepvaultResult<PathBuf> {
        self.vault.ensure(identity, self.fetcher.as_ref())
    }

    /// Build directory of `identity` under `config`.
    ///
    /// Fetches into the vault and materializes the build entry as needed;
    /// repeated calls with equal inputs return the same path and modify
    /// nothing.
    pub fn get_build_directory(
        &self,
        identity: &DependencyIdentity,
        config: &BuildConfig,
    ) -> DepvaultResult<PathBuf> {
        if let Some(stray) = self.router.stray_project_cache() {
            if !self.stray_reported.swap(true, Ordering::Relaxed) {
                warn!(
                    "Project-local cache {} is unused in shared mode; remove it with `depvault cache clean --legacy`",
                    stray.display()
                );
            }
        }

        let vault_path = self.ensure_vault(identity)?;
        let build_key = key::key(identity, config)?;
        debug!("Build key for {}: {}", identity, build_key.hash());

        self.builds
            .materialize(&vault_path, &build_key, config, self.generator.as_ref())
    }

    pub fn router(&self) -> &WorkspaceRouter {
        &self.router
    }

    pub fn vault(&self) -> &ContentStore {
        &self.vault
    }

    pub fn builds(&self) -> &BuildMaterializer {
        &self.builds
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }
}

impl fmt::Debug for BuildDirectoryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildDirectoryResolver")
            .field("mode", &self.router.mode())
            .field("vault", &self.vault.root())
            .field("builds", &self.builds.root())
            .field("fetcher", &self.fetcher.name())
            .finish_non_exhaustive()
    }
}
