//! Vault: immutable store of pristine dependency sources
//!
//! One directory per [`DependencyIdentity`], named
//! `<name>_<version>_<origin>`, holding the tree exactly as fetched plus the
//! `depvault/complete_copy` marker. Entries are fetched at most once per root
//! and never modified afterwards.

use crate::cache::fsops::{self, Published};
use crate::cache::identity::DependencyIdentity;
use crate::cache::lock::EntryLock;
use crate::cache::marker::CompletionRecord;
use crate::cache::{EntryInfo, MANIFEST_FILE};
use crate::error::{DepvaultError, DepvaultResult};
use crate::source::SourceFetcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The vault under one root directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the entry for `identity` has (or would have)
    pub fn entry_path(&self, identity: &DependencyIdentity) -> PathBuf {
        self.root.join(identity.vault_dir_name())
    }

    /// Whether an entry for `identity` has been published
    pub fn contains(&self, identity: &DependencyIdentity) -> bool {
        self.entry_path(identity).exists()
    }

    /// Return the vault entry for `identity`, fetching it first if missing.
    ///
    /// An existing entry is checked and returned untouched. A missing one is
    /// fetched into staging under the entry lock and published atomically;
    /// on fetch failure nothing is left behind.
    pub fn ensure(
        &self,
        identity: &DependencyIdentity,
        fetcher: &dyn SourceFetcher,
    ) -> DepvaultResult<PathBuf> {
        let entry = identity.vault_dir_name();
        let path = self.root.join(&entry);

        if path.exists() {
            check_entry(&path)?;
            debug!("Vault hit: {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            DepvaultError::io(format!("creating vault root {}", self.root.display()), e)
        })?;
        let _lock = EntryLock::acquire(&self.root, &entry, self.lock_timeout)?;

        if path.exists() {
            check_entry(&path)?;
            debug!("Vault entry published by another writer: {}", path.display());
            return Ok(path);
        }

        let swept = fsops::sweep_entry_staging(&self.root, &entry);
        if swept > 0 {
            debug!("Removed {} abandoned staging dirs for {}", swept, entry);
        }

        let staging = fsops::staging_path(&self.root, &entry);
        if let Err(e) = self.fill_staging(identity, fetcher, &staging) {
            fsops::discard(&staging);
            return Err(e);
        }

        match fsops::publish(&staging, &path) {
            Ok(Published::Placed) => info!("Stored {} in vault", identity),
            Ok(Published::AlreadyPresent) => debug!("Vault entry {} already present", entry),
            Err(e) => {
                fsops::discard(&staging);
                return Err(DepvaultError::fetch(
                    identity,
                    format!("could not publish vault entry: {}", e),
                ));
            }
        }

        Ok(path)
    }

    fn fill_staging(
        &self,
        identity: &DependencyIdentity,
        fetcher: &dyn SourceFetcher,
        staging: &Path,
    ) -> DepvaultResult<()> {
        fs::create_dir_all(staging)
            .map_err(|e| DepvaultError::io(format!("creating {}", staging.display()), e))?;

        debug!("Fetching {} into {}", identity, staging.display());
        fetcher.fetch(identity, staging).map_err(|e| match e {
            DepvaultError::FetchFailure { .. } => e,
            other => DepvaultError::fetch(identity, other.to_string()),
        })?;

        if !staging.join(MANIFEST_FILE).is_file() {
            return Err(DepvaultError::fetch(
                identity,
                format!("fetched tree has no {}", MANIFEST_FILE),
            ));
        }

        CompletionRecord::for_vault(identity)
            .write_to(staging)
            .map_err(|e| DepvaultError::fetch(identity, e.to_string()))?;
        fsops::sync_dir(staging);
        Ok(())
    }

    /// Structural check of the entry for `identity`
    pub fn verify(&self, identity: &DependencyIdentity) -> DepvaultResult<()> {
        check_entry(&self.entry_path(identity))
    }

    /// All entries under the root, sorted by name
    pub fn entries(&self) -> DepvaultResult<Vec<EntryInfo>> {
        crate::cache::list_entries(&self.root, |path| check_entry(path).is_ok())
    }
}

/// A vault entry must be a directory with a manifest and a completion marker.
fn check_entry(path: &Path) -> DepvaultResult<()> {
    if !path.is_dir() {
        return Err(DepvaultError::corrupt(path, "not a directory"));
    }
    if !path.join(MANIFEST_FILE).is_file() {
        return Err(DepvaultError::corrupt(
            path,
            format!("missing {}", MANIFEST_FILE),
        ));
    }
    if CompletionRecord::read_from(path)?.is_none() {
        return Err(DepvaultError::corrupt(path, "missing completion marker"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::lock::DEFAULT_LOCK_TIMEOUT;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    /// Fetcher that writes a fixed tree and counts calls
    #[derive(Default)]
    struct FakeFetcher {
        calls: AtomicUsize,
        fail: bool,
        omit_manifest: bool,
    }

    impl SourceFetcher for FakeFetcher {
        fn fetch(&self, identity: &DependencyIdentity, dest: &Path) -> DepvaultResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            fs::create_dir_all(dest.join("src")).unwrap();
            fs::write(dest.join("src").join(format!("{}.adb", identity.name())), "--").unwrap();
            if self.fail {
                return Err(DepvaultError::fetch(identity, "network unreachable"));
            }
            if !self.omit_manifest {
                fs::write(dest.join(MANIFEST_FILE), "name = \"x\"\n").unwrap();
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn hello() -> DependencyIdentity {
        DependencyIdentity::parse("hello", "1.0.1", "filesystem").unwrap()
    }

    #[test]
    fn ensure_fetches_and_marks_entry() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher::default();

        let path = store.ensure(&hello(), &fetcher).unwrap();

        assert_eq!(path, temp.path().join("hello_1.0.1_filesystem"));
        assert!(path.join(MANIFEST_FILE).is_file());
        assert!(path.join("src").join("hello.adb").is_file());
        assert!(path.join("depvault").join("complete_copy").is_file());
        assert!(store.contains(&hello()));
    }

    #[test]
    fn ensure_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher::default();

        let first = store.ensure(&hello(), &fetcher).unwrap();
        let marker = fs::read_to_string(CompletionRecord::path_in(&first)).unwrap();
        let second = store.ensure(&hello(), &fetcher).unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fs::read_to_string(CompletionRecord::path_in(&second)).unwrap(),
            marker
        );
    }

    #[test]
    fn fetch_failure_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher {
            fail: true,
            ..Default::default()
        };

        let err = store.ensure(&hello(), &fetcher).unwrap_err();

        assert!(matches!(err, DepvaultError::FetchFailure { .. }));
        assert!(!store.contains(&hello()));
        let staging: Vec<_> = fs::read_dir(temp.path().join(".staging"))
            .unwrap()
            .collect();
        assert!(staging.is_empty());
    }

    #[test]
    fn tree_without_manifest_is_fetch_failure() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher {
            omit_manifest: true,
            ..Default::default()
        };

        let err = store.ensure(&hello(), &fetcher).unwrap_err();
        assert!(err.to_string().contains("no depvault.toml"));
        assert!(!store.contains(&hello()));
    }

    #[test]
    fn corrupt_entry_is_reported_not_repaired() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher::default();
        let path = store.ensure(&hello(), &fetcher).unwrap();

        fs::remove_file(path.join(MANIFEST_FILE)).unwrap();

        let err = store.ensure(&hello(), &fetcher).unwrap_err();
        assert!(matches!(err, DepvaultError::CorruptEntry { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(!path.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn entries_report_completeness() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher::default();
        store.ensure(&hello(), &fetcher).unwrap();
        fs::create_dir_all(temp.path().join("broken_1.0.0_git")).unwrap();

        let entries = store.entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "broken_1.0.0_git");
        assert!(!entries[0].is_complete());
        assert_eq!(entries[1].name, "hello_1.0.1_filesystem");
        assert!(entries[1].is_complete());
    }

    #[test]
    fn concurrent_ensure_fetches_once() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT));
        let fetcher = Arc::new(FakeFetcher::default());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let fetcher = Arc::clone(&fetcher);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.ensure(&hello(), fetcher.as_ref())
                })
            })
            .collect();

        let paths: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(paths.iter().all(|p| p == &store.entry_path(&hello())));
        assert_eq!(store.entries().unwrap().len(), 1);
        assert_eq!(fs::read_dir(temp.path().join(".staging")).unwrap().count(), 0);
    }

    #[test]
    fn ensure_gives_up_on_held_lock() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), Duration::from_millis(200));
        let fetcher = FakeFetcher::default();
        let _held = EntryLock::acquire(temp.path(), "hello_1.0.1_filesystem", DEFAULT_LOCK_TIMEOUT)
            .unwrap();

        let err = store.ensure(&hello(), &fetcher).unwrap_err();

        assert!(matches!(err, DepvaultError::LockTimeout { .. }));
        assert!(err.is_retryable());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!store.contains(&hello()));
    }

    #[test]
    fn abandoned_staging_is_ignored_then_swept() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::new(temp.path(), DEFAULT_LOCK_TIMEOUT);
        let fetcher = FakeFetcher::default();
        let leftover = fsops::staging_path(temp.path(), "hello_1.0.1_filesystem");
        fs::create_dir_all(leftover.join("src")).unwrap();
        fs::write(leftover.join("src").join("half.adb"), "--").unwrap();

        assert!(store.entries().unwrap().is_empty());
        assert!(!store.contains(&hello()));

        let path = store.ensure(&hello(), &fetcher).unwrap();

        assert!(!leftover.exists());
        assert!(!path.join("src").join("half.adb").exists());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
