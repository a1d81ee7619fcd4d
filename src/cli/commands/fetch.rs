//! Fetch command - store a dependency in the vault

use super::{blocking, project_root, resolver_for};
use crate::cache::DependencyIdentity;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::DepvaultResult;
use tracing::debug;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> DepvaultResult<()> {
    let spec = args.dependency;
    let identity = DependencyIdentity::parse(&spec.name, &spec.dep_version, &spec.origin)?;
    let resolver = resolver_for(config, &project_root(spec.project)?)?;

    debug!("Fetching {} via {} fetcher", identity, resolver.fetcher_name());
    let path = blocking(move || resolver.ensure_vault(&identity)).await?;

    println!("{}", path.display());
    Ok(())
}
