//! Build-dir command - print the build directory of one dependency

use super::{blocking, project_root, resolver_for};
use crate::cache::{BuildConfig, BuildProfile, ConfigValue, DependencyIdentity};
use crate::cli::args::BuildDirArgs;
use crate::config::Config;
use crate::error::DepvaultResult;

/// Execute the build-dir command
pub async fn execute(args: BuildDirArgs, config: &Config) -> DepvaultResult<()> {
    let spec = &args.dependency;
    let identity = DependencyIdentity::parse(&spec.name, &spec.dep_version, &spec.origin)?;
    let build_config = build_config_from_args(&args)?;
    let resolver = resolver_for(config, &project_root(args.dependency.project.clone())?)?;

    let path = blocking(move || resolver.get_build_directory(&identity, &build_config)).await?;

    println!("{}", path.display());
    Ok(())
}

fn build_config_from_args(args: &BuildDirArgs) -> DepvaultResult<BuildConfig> {
    let profile: BuildProfile = args.profile.parse()?;
    let mut config = BuildConfig::new().with_profile(profile);

    for feature in &args.features {
        config = config.with_feature(feature.as_str());
    }
    for (name, value) in &args.variables {
        config = config.with_variable(name.as_str(), ConfigValue::parse_loose(value));
    }
    for (key, value) in &args.environment {
        config = config.with_env(key.as_str(), value.as_str());
    }
    Ok(config)
}
