//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// depvault - dependency vault and build cache
///
/// Fetches each dependency version once into an immutable vault and hands
/// out per-configuration build directories keyed by a content hash.
#[derive(Parser, Debug)]
#[command(name = "depvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEPVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .depvault.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a dependency in the vault and print its path
    Fetch(FetchArgs),

    /// Print the build directory of a dependency under a configuration
    BuildDir(BuildDirArgs),

    /// Materialize every locked dependency of a project
    Sync(SyncArgs),

    /// Inspect and clean the vault and build cache
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// A dependency given on the command line
#[derive(Parser, Debug, Clone)]
pub struct DependencySpec {
    /// Dependency name
    pub name: String,

    /// Exact version
    #[arg(id = "dep_version", value_name = "VERSION")]
    pub dep_version: String,

    /// Origin kind (filesystem, git, hg, svn, archive, registry)
    #[arg(long, default_value = "filesystem")]
    pub origin: String,

    /// Project directory used for local-mode roots (defaults to current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub dependency: DependencySpec,
}

/// Arguments for the build-dir command
#[derive(Parser, Debug)]
pub struct BuildDirArgs {
    #[command(flatten)]
    pub dependency: DependencySpec,

    /// Build profile (release, validation, development)
    #[arg(long, default_value = "development")]
    pub profile: String,

    /// Enable a feature (repeatable)
    #[arg(short = 'F', long = "feature")]
    pub features: Vec<String>,

    /// Set a configuration variable (NAME=VALUE, repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variables: Vec<(String, String)>,

    /// Set an environment fact (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_parser = parse_key_value)]
    pub environment: Vec<(String, String)>,
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., dependencies.shared)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .depvault.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,

    /// Project directory used for local-mode roots (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List vault and build entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show cache roots, mode and usage
    Info,

    /// Remove abandoned staging directories
    Clean {
        /// Also remove a project-local cache left over from local mode
        #[arg(long)]
        legacy: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parse a KEY=VALUE pair
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE format: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
