//! Completion markers
//!
//! Every published entry carries `depvault/complete_copy`, a small TOML
//! record of what the entry holds and when it was completed. Vault entries
//! record their provenance; build entries add the build hash.

use crate::cache::identity::DependencyIdentity;
use crate::cache::{COMPLETE_COPY_MARKER, METADATA_DIR};
use crate::error::{DepvaultError, DepvaultResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Contents of a `complete_copy` marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub name: String,
    pub version: String,
    pub origin: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_hash: Option<String>,
}

impl CompletionRecord {
    /// Record for a freshly fetched vault entry
    pub fn for_vault(identity: &DependencyIdentity) -> Self {
        Self {
            name: identity.name().to_string(),
            version: identity.version().to_string(),
            origin: identity.origin().to_string(),
            completed_at: Utc::now(),
            build_hash: None,
        }
    }

    /// Record for a materialized build entry
    pub fn for_build(identity: &DependencyIdentity, hash: &str) -> Self {
        Self {
            build_hash: Some(hash.to_string()),
            ..Self::for_vault(identity)
        }
    }

    /// Marker path inside an entry
    pub fn path_in(entry: &Path) -> PathBuf {
        entry.join(METADATA_DIR).join(COMPLETE_COPY_MARKER)
    }

    /// Write the marker into `entry`, replacing any copied marker, and sync it.
    pub fn write_to(&self, entry: &Path) -> DepvaultResult<()> {
        let path = Self::path_in(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DepvaultError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| DepvaultError::io(format!("creating {}", path.display()), e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| DepvaultError::io(format!("writing {}", path.display()), e))?;
        file.sync_all()
            .map_err(|e| DepvaultError::io(format!("syncing {}", path.display()), e))?;
        Ok(())
    }

    /// Read the marker of an entry, `None` if it has none
    pub fn read_from(entry: &Path) -> DepvaultResult<Option<Self>> {
        let path = Self::path_in(entry);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| DepvaultError::io(format!("reading {}", path.display()), e))?;
        let record = toml::from_str(&content)
            .map_err(|e| DepvaultError::corrupt(entry, format!("unreadable marker: {}", e)))?;
        Ok(Some(record))
    }
}
