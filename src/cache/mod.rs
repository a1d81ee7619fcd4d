//! Two-tier dependency cache
//!
//! The vault holds pristine sources, one entry per dependency identity. The
//! build cache holds per-configuration copies, one entry per build key, each
//! with its generated configuration files.
//!
//! # Layout
//!
//! ```text
//! <vault root>/<name>_<version>_<origin>/
//! <builds root>/<name>_<version>_<origin>_<sha256>/
//! <root>/.locks/<entry>.lock
//! <root>/.staging/<entry>.<uuid>/
//! ```
//!
//! # Entry States
//!
//! | State | Marker | Description |
//! |-------|--------|-------------|
//! | Absent | - | Not published yet, created on first request |
//! | Complete | present | Published atomically, never modified |
//! | Incomplete | missing | Damaged or foreign directory, reported not repaired |

pub mod fsops;
pub mod identity;
pub mod key;
pub mod lock;
pub mod marker;
pub mod materialize;
pub mod resolver;
pub mod router;
pub mod vault;

pub use identity::{DependencyIdentity, OriginKind};
pub use key::{key, BuildConfig, BuildKey, BuildProfile, ConfigValue};
pub use lock::{EntryLock, DEFAULT_LOCK_TIMEOUT};
pub use marker::CompletionRecord;
pub use materialize::BuildMaterializer;
pub use resolver::BuildDirectoryResolver;
pub use router::{RootKind, SharingMode, WorkspaceRouter};
pub use vault::ContentStore;

use crate::error::{DepvaultError, DepvaultResult};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Manifest file every dependency tree carries at its root
pub const MANIFEST_FILE: &str = "depvault.toml";

/// Tool-owned metadata directory inside entries and projects
pub const METADATA_DIR: &str = "depvault";

/// Completion marker file name inside [`METADATA_DIR`]
pub const COMPLETE_COPY_MARKER: &str = "complete_copy";

/// Generated configuration directory inside build entries
pub const CONFIG_DIR: &str = "config";

/// State of a cache entry as seen on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Complete,
    Incomplete,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

/// One directory found under a cache root
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub state: EntryState,
}

impl EntryInfo {
    pub fn is_complete(&self) -> bool {
        self.state == EntryState::Complete
    }
}

/// List entry directories under `root`, skipping bookkeeping directories.
///
/// A missing root has no entries.
pub(crate) fn list_entries(
    root: &Path,
    check: impl Fn(&Path) -> bool,
) -> DepvaultResult<Vec<EntryInfo>> {
    let read_dir = match fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DepvaultError::io(format!("reading {}", root.display()), e)),
    };

    let mut entries = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| DepvaultError::io(format!("reading {}", root.display()), e))?;
        let name = item.file_name().to_string_lossy().into_owned();
        let path = item.path();
        if fsops::is_reserved(&name) || !path.is_dir() {
            continue;
        }

        let state = if check(&path) {
            EntryState::Complete
        } else {
            EntryState::Incomplete
        };
        entries.push(EntryInfo { name, path, state });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Total size in bytes of the files under `path`
pub fn disk_usage(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
