//! Error types for depvault
//!
//! All modules use `DepvaultResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for depvault operations
pub type DepvaultResult<T> = Result<T, DepvaultError>;

/// All errors that can occur in depvault
#[derive(Error, Debug)]
pub enum DepvaultError {
    // Cache errors
    #[error("Failed to fetch {identity}: {reason}")]
    FetchFailure { identity: String, reason: String },

    #[error("Corrupt cache entry at {path}: {reason}")]
    CorruptEntry { path: PathBuf, reason: String },

    #[error("Failed to generate configuration for {name}: {reason}")]
    GenerationFailure { name: String, reason: String },

    #[error("Timed out after {}s waiting for lock {path}", .waited.as_secs())]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("Failed to materialize build entry {entry}: {reason}")]
    MaterializationFailure { entry: String, reason: String },

    #[error("Invalid dependency identity: {0}")]
    InvalidIdentity(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Project errors
    #[error("No depvault.toml found in {0} or any parent directory")]
    ProjectNotFound(PathBuf),

    #[error("Invalid manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DepvaultError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch failure for a dependency
    pub fn fetch(identity: impl ToString, reason: impl Into<String>) -> Self {
        Self::FetchFailure {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt entry error
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptEntry {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a materialization failure for a build entry
    pub fn materialization(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MaterializationFailure {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::LockTimeout { .. } => {
                Some("Another depvault process is writing this entry. Retry once it finishes.")
            }
            Self::CorruptEntry { .. } => {
                Some("Remove the entry directory and run again to fetch a fresh copy")
            }
            Self::ProjectNotFound(_) => Some("Run inside a project containing depvault.toml"),
            Self::FetchFailure { .. } => {
                Some("Check dependencies.index points at a directory laid out as <name>/<version>/")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DepvaultError::fetch("hello=1.0.1", "not found");
        assert_eq!(err.to_string(), "Failed to fetch hello=1.0.1: not found");
    }

    #[test]
    fn lock_timeout_display_in_seconds() {
        let err = DepvaultError::LockTimeout {
            path: PathBuf::from("/tmp/x.lock"),
            waited: Duration::from_millis(2500),
        };
        assert!(err.to_string().contains("after 2s"));
    }

    #[test]
    fn error_hint() {
        let err = DepvaultError::corrupt("/vault/hello_1.0.1_filesystem", "missing manifest");
        assert!(err.hint().unwrap().contains("Remove the entry"));
        assert!(DepvaultError::Internal("x".into()).hint().is_none());
    }

    #[test]
    fn error_retryable() {
        let timeout = DepvaultError::LockTimeout {
            path: PathBuf::from("/tmp/x.lock"),
            waited: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(!DepvaultError::materialization("e", "r").is_retryable());
    }
}
