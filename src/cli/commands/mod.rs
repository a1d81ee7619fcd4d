//! CLI command implementations

pub mod build_dir;
pub mod cache;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod sync;

pub use build_dir::execute as build_dir;
pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use sync::execute as sync;

use crate::cache::{BuildDirectoryResolver, WorkspaceRouter};
use crate::config::Config;
use crate::error::{DepvaultError, DepvaultResult};
use crate::generate::BindingsGenerator;
use crate::project::Project;
use crate::source::FilesystemFetcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Router for the configured sharing mode and the given project root
pub(crate) fn router_for(config: &Config, project_root: &Path) -> WorkspaceRouter {
    let shared_root = config
        .dependencies
        .dir
        .clone()
        .unwrap_or_else(WorkspaceRouter::default_shared_root);
    WorkspaceRouter::new(config.sharing_mode(), shared_root, project_root)
}

/// Resolver wired to the filesystem index and the bindings generator
pub(crate) fn resolver_for(
    config: &Config,
    project_root: &Path,
) -> DepvaultResult<Arc<BuildDirectoryResolver>> {
    let index = config.dependencies.index.clone().ok_or_else(|| {
        DepvaultError::User(
            "No dependency index configured. Run: depvault config set dependencies.index <dir>"
                .to_string(),
        )
    })?;

    Ok(Arc::new(BuildDirectoryResolver::new(
        router_for(config, project_root),
        Box::new(FilesystemFetcher::new(index)),
        Box::new(BindingsGenerator::new()),
        config.lock_timeout(),
    )))
}

/// Project root for commands that may run outside a project.
///
/// An explicit directory wins; otherwise the enclosing project, or the
/// current directory if there is none.
pub(crate) fn project_root(explicit: Option<PathBuf>) -> DepvaultResult<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| DepvaultError::io("getting current directory", e))?;
    Ok(Project::find_root(&cwd).unwrap_or(cwd))
}

/// Run blocking cache work off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> DepvaultResult<T>
where
    F: FnOnce() -> DepvaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DepvaultError::Internal(format!("cache task failed: {}", e)))?
}
