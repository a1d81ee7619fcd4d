//! Build configuration file generation
//!
//! A [`ConfigGenerator`] writes the configuration artifacts of one dependency
//! build into the `config/` directory of a staged build entry. The shipped
//! [`BindingsGenerator`] emits three renderings of the same values:
//!
//! - `<name>_config.ads` - Ada package spec
//! - `<name>_config.gpr` - GPR abstract project
//! - `<name>_config.h` - C header

use crate::cache::identity::DependencyIdentity;
use crate::cache::key::{BuildConfig, ConfigValue};
use crate::error::{DepvaultError, DepvaultResult};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Writes generated configuration for one dependency
pub trait ConfigGenerator: Send + Sync {
    /// Write artifacts for `identity` under `config` into `dest`
    fn generate(
        &self,
        identity: &DependencyIdentity,
        config: &BuildConfig,
        dest: &Path,
    ) -> DepvaultResult<()>;
}

/// Output language of one generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingFormat {
    Ada,
    Gpr,
    C,
}

impl BindingFormat {
    pub fn all() -> &'static [Self] {
        &[Self::Ada, Self::Gpr, Self::C]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ada => "ads",
            Self::Gpr => "gpr",
            Self::C => "h",
        }
    }

    /// File name for a dependency: `<name>_config.<ext>`
    pub fn file_name(&self, dependency: &str) -> String {
        format!("{}_config.{}", dependency, self.extension())
    }
}

/// Generator for Ada, GPR and C configuration bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingsGenerator;

impl BindingsGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render one artifact
    pub fn render(
        &self,
        format: BindingFormat,
        identity: &DependencyIdentity,
        config: &BuildConfig,
    ) -> DepvaultResult<String> {
        validate_variables(identity, config)?;

        let rendered = match format {
            BindingFormat::Ada => render_ada(identity, config),
            BindingFormat::Gpr => render_gpr(identity, config),
            BindingFormat::C => render_c(identity, config),
        };
        rendered.map_err(|e| DepvaultError::GenerationFailure {
            name: identity.name().to_string(),
            reason: e.to_string(),
        })
    }
}

impl ConfigGenerator for BindingsGenerator {
    fn generate(
        &self,
        identity: &DependencyIdentity,
        config: &BuildConfig,
        dest: &Path,
    ) -> DepvaultResult<()> {
        fs::create_dir_all(dest)
            .map_err(|e| DepvaultError::io(format!("creating {}", dest.display()), e))?;

        for format in BindingFormat::all() {
            let content = self.render(*format, identity, config)?;
            let path = dest.join(format.file_name(identity.name()));
            fs::write(&path, content)
                .map_err(|e| DepvaultError::io(format!("writing {}", path.display()), e))?;
            debug!("Generated {}", path.display());
        }
        Ok(())
    }
}

/// Names taken by the generated constants, compared case-insensitively
const BUILTIN_NAMES: &[&str] = &[
    "crate_version",
    "crate_name",
    "build_profile",
    "build_profile_kind",
    "config_h",
];

/// Ada reserved words
const ADA_RESERVED: &[&str] = &[
    "abort", "abs", "abstract", "accept", "access", "aliased", "all", "and", "array", "at",
    "begin", "body", "case", "constant", "declare", "delay", "delta", "digits", "do", "else",
    "elsif", "end", "entry", "exception", "exit", "for", "function", "generic", "goto", "if",
    "in", "interface", "is", "limited", "loop", "mod", "new", "not", "null", "of", "or",
    "others", "out", "overriding", "package", "parallel", "pragma", "private", "procedure",
    "protected", "raise", "range", "record", "rem", "renames", "requeue", "return", "reverse",
    "select", "separate", "some", "subtype", "synchronized", "tagged", "task", "terminate",
    "then", "type", "until", "use", "when", "while", "with", "xor",
];

/// Variable names must render to distinct, legal identifiers in every format.
///
/// Ada is case-insensitive and C names are upper-cased, so names that differ
/// only in case collide.
fn validate_variables(identity: &DependencyIdentity, config: &BuildConfig) -> DepvaultResult<()> {
    let fail = |reason: String| DepvaultError::GenerationFailure {
        name: identity.name().to_string(),
        reason,
    };

    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for name in config.variables.keys() {
        let valid = name.starts_with(|c: char| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.ends_with('_')
            && !name.contains("__");
        if !valid {
            return Err(fail(format!("variable '{}' is not a valid identifier", name)));
        }

        let folded = name.to_ascii_lowercase();
        if BUILTIN_NAMES.contains(&folded.as_str()) {
            return Err(fail(format!("variable '{}' clashes with a generated constant", name)));
        }
        if ADA_RESERVED.contains(&folded.as_str()) {
            return Err(fail(format!("variable '{}' is an Ada reserved word", name)));
        }
        if let Some(previous) = seen.insert(folded, name) {
            return Err(fail(format!(
                "variables '{}' and '{}' differ only in case",
                previous, name
            )));
        }
    }
    Ok(())
}

/// `hello_world` -> `Hello_World`
fn mixed_case(name: &str) -> String {
    name.split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn quote(value: &str, escaped_quote: &str) -> String {
    format!("\"{}\"", value.replace('"', escaped_quote))
}

fn render_ada(identity: &DependencyIdentity, config: &BuildConfig) -> Result<String, std::fmt::Error> {
    let package = format!("{}_Config", mixed_case(identity.name()));
    let version = identity.version();
    let mut out = String::new();

    writeln!(out, "--  Configuration for {} generated by depvault", identity.name())?;
    writeln!(out, "pragma Restrictions (No_Elaboration_Code);")?;
    writeln!(out, "pragma Style_Checks (Off);")?;
    writeln!(out)?;
    writeln!(out, "package {} is", package)?;
    writeln!(out, "   pragma Pure;")?;
    writeln!(out)?;
    writeln!(out, "   Crate_Version : constant String := \"{}\";", version)?;
    writeln!(out, "   Crate_Name : constant String := \"{}\";", identity.name())?;
    writeln!(out)?;
    writeln!(out, "   type Build_Profile_Kind is (release, validation, development);")?;
    writeln!(
        out,
        "   Build_Profile : constant Build_Profile_Kind := {};",
        config.profile
    )?;

    for (name, value) in &config.variables {
        let name = mixed_case(name);
        match value {
            ConfigValue::Bool(b) => {
                writeln!(out, "   {} : constant Boolean := {};", name, if *b { "True" } else { "False" })?
            }
            ConfigValue::Integer(n) => writeln!(out, "   {} : constant := {};", name, n)?,
            ConfigValue::String(s) => {
                writeln!(out, "   {} : constant String := {};", name, quote(s, "\"\""))?
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "end {};", package)?;
    Ok(out)
}

fn render_gpr(identity: &DependencyIdentity, config: &BuildConfig) -> Result<String, std::fmt::Error> {
    let project = format!("{}_Config", mixed_case(identity.name()));
    let mut out = String::new();

    writeln!(out, "--  Configuration for {} generated by depvault", identity.name())?;
    writeln!(out, "abstract project {} is", project)?;
    writeln!(out, "   Crate_Version := \"{}\";", identity.version())?;
    writeln!(out, "   Crate_Name := \"{}\";", identity.name())?;
    writeln!(out, "   Build_Profile := \"{}\";", config.profile)?;

    for (name, value) in &config.variables {
        let rendered = match value {
            ConfigValue::String(s) => quote(s, "\"\""),
            other => format!("\"{}\"", other),
        };
        writeln!(out, "   {} := {};", mixed_case(name), rendered)?;
    }

    writeln!(out, "end {};", project)?;
    Ok(out)
}

fn render_c(identity: &DependencyIdentity, config: &BuildConfig) -> Result<String, std::fmt::Error> {
    let prefix = identity.name().to_ascii_uppercase();
    let guard = format!("{}_CONFIG_H", prefix);
    let version = identity.version();
    let mut out = String::new();

    writeln!(out, "/* Configuration for {} generated by depvault */", identity.name())?;
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    writeln!(out, "#define CRATE_VERSION \"{}\"", version)?;
    writeln!(out, "#define CRATE_NAME \"{}\"", identity.name())?;
    writeln!(out)?;
    writeln!(out, "#define BUILD_PROFILE_RELEASE 1")?;
    writeln!(out, "#define BUILD_PROFILE_VALIDATION 2")?;
    writeln!(out, "#define BUILD_PROFILE_DEVELOPMENT 3")?;
    writeln!(
        out,
        "#define BUILD_PROFILE BUILD_PROFILE_{}",
        config.profile.as_str().to_ascii_uppercase()
    )?;

    if !config.variables.is_empty() {
        writeln!(out)?;
    }
    for (name, value) in &config.variables {
        let name = format!("{}_{}", prefix, name.to_ascii_uppercase());
        match value {
            ConfigValue::Bool(b) => writeln!(out, "#define {} {}", name, u8::from(*b))?,
            ConfigValue::Integer(n) => writeln!(out, "#define {} {}", name, n)?,
            ConfigValue::String(s) => {
                let escaped = s.replace('\\', "\\\\");
                writeln!(out, "#define {} {}", name, quote(&escaped, "\\\""))?
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "#endif")?;
    Ok(out)
}
