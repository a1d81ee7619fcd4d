//! Sync command - materialize every locked dependency of a project

use super::{blocking, resolver_for};
use crate::cli::args::SyncArgs;
use crate::config::Config;
use crate::error::{DepvaultError, DepvaultResult};
use crate::project::Project;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the sync command
pub async fn execute(args: SyncArgs, config: &Config) -> DepvaultResult<()> {
    let ctx = UiContext::detect();
    let start = match args.project {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| DepvaultError::io("getting current directory", e))?,
    };
    let project = Project::discover(&start).await?;
    let identities = project.lockfile.identities()?;

    if identities.is_empty() {
        ui::step_info(&ctx, "No locked dependencies");
        return Ok(());
    }

    let resolver = resolver_for(config, &project.root)?;
    if let Some(stray) = resolver.router().stray_project_cache() {
        ui::step_warn_hint(
            &ctx,
            &format!("Unused project-local cache at {}", stray.display()),
            "Run: depvault cache clean --legacy",
        );
    }
    debug!(
        "Syncing {} dependencies in {} mode",
        identities.len(),
        resolver.router().mode()
    );

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Syncing {} dependencies...", identities.len()));

    let mut resolved = Vec::with_capacity(identities.len());
    for identity in identities {
        let build_config = project.manifest.build_config_for(identity.name());
        let worker = Arc::clone(&resolver);
        let id = identity.clone();
        match blocking(move || worker.get_build_directory(&id, &build_config)).await {
            Ok(path) => resolved.push((identity, path)),
            Err(e) => {
                spinner.stop_error(&format!("Failed on {}", identity));
                return Err(e);
            }
        }
    }

    spinner.stop(&format!("Synced {} dependencies", resolved.len()));
    for (identity, path) in &resolved {
        ui::step_ok_detail(&ctx, &identity.to_string(), &path.display().to_string());
    }
    Ok(())
}
