//! Build cache materialization
//!
//! Turns a vault entry into a build entry for one [`BuildKey`]: an independent
//! copy of the vault tree plus a `config/` directory written by a
//! [`ConfigGenerator`]. Build entries are published atomically and reused
//! as-is for the same key.

use crate::cache::fsops::{self, Published};
use crate::cache::key::{self, BuildConfig, BuildKey};
use crate::cache::lock::EntryLock;
use crate::cache::marker::CompletionRecord;
use crate::cache::{EntryInfo, CONFIG_DIR};
use crate::error::{DepvaultError, DepvaultResult};
use crate::generate::ConfigGenerator;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The build cache under one root directory
#[derive(Debug, Clone)]
pub struct BuildMaterializer {
    root: PathBuf,
    lock_timeout: Duration,
}

impl BuildMaterializer {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the build entry for `key` has (or would have)
    pub fn entry_path(&self, key: &BuildKey) -> PathBuf {
        self.root.join(key.dir_name())
    }

    /// Return the build entry for `key`, creating it from `vault_path` if missing.
    pub fn materialize(
        &self,
        vault_path: &Path,
        key: &BuildKey,
        config: &BuildConfig,
        generator: &dyn ConfigGenerator,
    ) -> DepvaultResult<PathBuf> {
        let entry = key.dir_name();
        let path = self.root.join(&entry);

        if key::key(key.identity(), config)? != *key {
            return Err(DepvaultError::materialization(
                &entry,
                "build key was not computed from this configuration",
            ));
        }

        if path.exists() {
            check_entry(&path, Some(key.hash()))?;
            debug!("Build cache hit: {}", path.display());
            return Ok(path);
        }

        if !vault_path.is_dir() {
            return Err(DepvaultError::materialization(
                &entry,
                format!("vault entry {} does not exist", vault_path.display()),
            ));
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            DepvaultError::io(format!("creating builds root {}", self.root.display()), e)
        })?;
        let _lock = EntryLock::acquire(&self.root, &entry, self.lock_timeout)?;

        if path.exists() {
            check_entry(&path, Some(key.hash()))?;
            debug!("Build entry published by another writer: {}", path.display());
            return Ok(path);
        }

        let swept = fsops::sweep_entry_staging(&self.root, &entry);
        if swept > 0 {
            debug!("Removed {} abandoned staging dirs for {}", swept, entry);
        }

        let staging = fsops::staging_path(&self.root, &entry);
        if let Err(e) = self.fill_staging(vault_path, key, config, generator, &staging) {
            fsops::discard(&staging);
            return Err(e);
        }

        match fsops::publish(&staging, &path) {
            Ok(Published::Placed) => info!("Materialized {}", key),
            Ok(Published::AlreadyPresent) => debug!("Build entry {} already present", entry),
            Err(e) => {
                fsops::discard(&staging);
                return Err(DepvaultError::materialization(&entry, e.to_string()));
            }
        }

        Ok(path)
    }

    fn fill_staging(
        &self,
        vault_path: &Path,
        key: &BuildKey,
        config: &BuildConfig,
        generator: &dyn ConfigGenerator,
        staging: &Path,
    ) -> DepvaultResult<()> {
        let entry = key.dir_name();

        fsops::copy_tree(vault_path, staging, &[])
            .map_err(|e| DepvaultError::materialization(&entry, e.to_string()))?;

        generator
            .generate(key.identity(), config, &staging.join(CONFIG_DIR))
            .map_err(|e| match e {
                DepvaultError::GenerationFailure { .. } => e,
                other => DepvaultError::GenerationFailure {
                    name: key.identity().name().to_string(),
                    reason: other.to_string(),
                },
            })?;

        CompletionRecord::for_build(key.identity(), key.hash())
            .write_to(staging)
            .map_err(|e| DepvaultError::materialization(&entry, e.to_string()))?;
        fsops::sync_dir(staging);
        Ok(())
    }

    /// All entries under the root, sorted by name
    pub fn entries(&self) -> DepvaultResult<Vec<EntryInfo>> {
        crate::cache::list_entries(&self.root, |path| check_entry(path, None).is_ok())
    }
}

/// A build entry must be a directory with a completion marker and `config/`.
///
/// With `expected`, the marker must also record that build hash.
fn check_entry(path: &Path, expected: Option<&str>) -> DepvaultResult<()> {
    if !path.is_dir() {
        return Err(DepvaultError::corrupt(path, "not a directory"));
    }
    if !path.join(CONFIG_DIR).is_dir() {
        return Err(DepvaultError::corrupt(path, "missing generated config"));
    }
    match CompletionRecord::read_from(path)? {
        Some(record) => match (record.build_hash.as_deref(), expected) {
            (None, _) => Err(DepvaultError::corrupt(path, "marker has no build hash")),
            (Some(found), Some(expected)) if found != expected => Err(DepvaultError::corrupt(
                path,
                format!("marker records build hash {}, expected {}", found, expected),
            )),
            _ => Ok(()),
        },
        None => Err(DepvaultError::corrupt(path, "missing completion marker")),
    }
}
