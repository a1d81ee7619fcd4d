//! Filesystem primitives for cache entries
//!
//! Entries are built in `<root>/.staging/<entry>.<uuid>` and published with a
//! single `rename` onto `<root>/<entry>`. Staging and final paths share a
//! root, so the rename never crosses a filesystem and readers see either no
//! entry or a complete one.

use crate::cache::lock::EntryLock;
use crate::error::{DepvaultError, DepvaultResult};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Directory holding unpublished entries under a cache root
pub const STAGING_DIR: &str = ".staging";

/// Outcome of publishing a staged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// The staged tree now lives at the final path
    Placed,
    /// Another writer published first; the staged tree was discarded
    AlreadyPresent,
}

/// Fresh staging path for an entry: `<root>/.staging/<entry>.<uuid>`
pub fn staging_path(root: &Path, entry: &str) -> PathBuf {
    root.join(STAGING_DIR)
        .join(format!("{}.{}", entry, Uuid::new_v4().simple()))
}

/// Entry name a staging directory belongs to
pub fn staging_target(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(entry, _)| entry)
        .filter(|entry| !entry.is_empty())
}

/// Whether a directory name under a cache root is bookkeeping, not an entry
pub fn is_reserved(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// Recursively copy `src` into `dst`, skipping top-level names in `skip`.
///
/// Every file is copied; nothing in `dst` links back into `src`. Symlinks are
/// replaced by a copy of what they point to, and must resolve inside `src`.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, skip: &[&str]) -> DepvaultResult<u64> {
    let src_root = fs::canonicalize(src)
        .map_err(|e| DepvaultError::io(format!("resolving {}", src.display()), e))?;
    fs::create_dir_all(dst)
        .map_err(|e| DepvaultError::io(format!("creating {}", dst.display()), e))?;

    let mut copied = 0;
    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() != 1
                || !skip
                    .iter()
                    .any(|name| entry.file_name() == std::ffi::OsStr::new(name))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let context = format!("walking {}", src.display());
            match e.into_io_error() {
                Some(source) => DepvaultError::io(context, source),
                None => DepvaultError::Internal(format!("{}: symlink loop", context)),
            }
        })?;

        if entry.path_is_symlink() {
            check_link_target(&src_root, entry.path())?;
        }

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| DepvaultError::Internal(format!("walked outside {}: {}", src.display(), e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| DepvaultError::io(format!("creating {}", target.display()), e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                DepvaultError::io(
                    format!("copying {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
            copied += 1;
        }
    }

    debug!("Copied {} files from {} to {}", copied, src.display(), dst.display());
    Ok(copied)
}

/// A symlink may only point at something inside the tree being copied
fn check_link_target(root: &Path, link: &Path) -> DepvaultResult<()> {
    let resolved = fs::canonicalize(link)
        .map_err(|e| DepvaultError::io(format!("resolving link {}", link.display()), e))?;
    if resolved.starts_with(root) {
        return Ok(());
    }
    Err(DepvaultError::io(
        format!(
            "copying link {}: target {} is outside {}",
            link.display(),
            resolved.display(),
            root.display()
        ),
        io::Error::from(io::ErrorKind::InvalidInput),
    ))
}

/// Flush a directory's entries to disk (no-op where unsupported)
pub fn sync_dir(path: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(path).and_then(|dir| dir.sync_all()) {
            debug!("Could not sync {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Atomically move a staged tree to its final path.
///
/// If the final path already exists the staged tree is discarded and
/// [`Published::AlreadyPresent`] returned; the existing entry wins.
pub fn publish(staging: &Path, final_path: &Path) -> DepvaultResult<Published> {
    if final_path.exists() {
        discard(staging);
        return Ok(Published::AlreadyPresent);
    }

    match fs::rename(staging, final_path) {
        Ok(()) => {
            if let Some(parent) = final_path.parent() {
                sync_dir(parent);
            }
            Ok(Published::Placed)
        }
        Err(_) if final_path.exists() => {
            discard(staging);
            Ok(Published::AlreadyPresent)
        }
        Err(e) => Err(DepvaultError::io(
            format!("publishing {} as {}", staging.display(), final_path.display()),
            e,
        )),
    }
}

/// Best-effort removal of a staging tree
pub fn discard(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("Discarded {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

/// Remove abandoned staging directories of one entry.
///
/// Caller must hold that entry's lock.
pub fn sweep_entry_staging(root: &Path, entry: &str) -> usize {
    let Ok(read_dir) = fs::read_dir(root.join(STAGING_DIR)) else {
        return 0;
    };

    let mut removed = 0;
    for item in read_dir.flatten() {
        let name = item.file_name();
        if staging_target(&name.to_string_lossy()) == Some(entry) {
            discard(&item.path());
            removed += 1;
        }
    }
    removed
}

/// Remove every abandoned staging directory whose entry lock is free.
///
/// Staging trees of writers still running are left alone.
pub fn sweep_staging(root: &Path) -> DepvaultResult<Vec<PathBuf>> {
    let staging_root = root.join(STAGING_DIR);
    let read_dir = match fs::read_dir(&staging_root) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DepvaultError::io(
                format!("reading {}", staging_root.display()),
                e,
            ))
        }
    };

    let mut removed = Vec::new();
    for item in read_dir.flatten() {
        let path = item.path();
        let name = item.file_name().to_string_lossy().into_owned();
        let Some(entry) = staging_target(&name) else {
            continue;
        };

        // A live writer holds the lock while its staging tree is in use.
        if let Some(_lock) = EntryLock::try_acquire(root, entry)? {
            discard(&path);
            removed.push(path);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("depvault").join("cache")).unwrap();
        fs::write(root.join("depvault.toml"), "name = \"hello\"\n").unwrap();
        fs::write(root.join("src").join("hello.adb"), "procedure Hello is null;\n").unwrap();
    }

    #[test]
    fn copy_tree_copies_everything() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        sample_tree(&src);

        let copied = copy_tree(&src, &dst, &[]).unwrap();

        assert_eq!(copied, 2);
        assert!(dst.join("depvault.toml").is_file());
        assert!(dst.join("src").join("hello.adb").is_file());
        assert!(dst.join("depvault").join("cache").is_dir());
    }

    #[test]
    fn copy_tree_skips_top_level_names_only() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        sample_tree(&src);
        fs::create_dir_all(src.join("src").join("depvault")).unwrap();

        copy_tree(&src, &dst, &["depvault"]).unwrap();

        assert!(!dst.join("depvault").exists());
        assert!(dst.join("src").join("depvault").is_dir());
    }

    #[test]
    fn copy_is_independent_of_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        sample_tree(&src);
        copy_tree(&src, &dst, &[]).unwrap();

        fs::write(dst.join("src").join("hello.adb"), "changed").unwrap();

        let original = fs::read_to_string(src.join("src").join("hello.adb")).unwrap();
        assert_eq!(original, "procedure Hello is null;\n");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_replaces_inner_links_with_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        sample_tree(&src);
        std::os::unix::fs::symlink("hello.adb", src.join("src").join("alias.adb")).unwrap();
        std::os::unix::fs::symlink("src", src.join("sources")).unwrap();

        let copied = copy_tree(&src, &dst, &[]).unwrap();

        assert_eq!(copied, 5);
        let alias = dst.join("src").join("alias.adb");
        assert!(!alias.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(!dst.join("sources").symlink_metadata().unwrap().file_type().is_symlink());
        assert!(dst.join("sources").join("hello.adb").is_file());

        fs::write(&alias, "changed").unwrap();
        let original = fs::read_to_string(src.join("src").join("hello.adb")).unwrap();
        assert_eq!(original, "procedure Hello is null;\n");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_rejects_links_leaving_the_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let outside = temp.path().join("outside.txt");
        sample_tree(&src);
        fs::write(&outside, "host data").unwrap();
        std::os::unix::fs::symlink(&outside, src.join("src").join("data.txt")).unwrap();

        let err = copy_tree(&src, &temp.path().join("dst"), &[]).unwrap_err();

        assert!(err.to_string().contains("copying link"));
        assert_eq!(fs::read_to_string(&outside).unwrap(), "host data");
    }

    #[test]
    fn staging_target_strips_uuid() {
        let temp = TempDir::new().unwrap();
        let path = staging_path(temp.path(), "hello_1.0.1_filesystem");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();

        assert_eq!(staging_target(&name), Some("hello_1.0.1_filesystem"));
        assert_eq!(staging_target("nodot"), None);
    }

    #[test]
    fn publish_places_tree() {
        let temp = TempDir::new().unwrap();
        let staging = staging_path(temp.path(), "entry");
        sample_tree(&staging);
        let final_path = temp.path().join("entry");

        assert_eq!(publish(&staging, &final_path).unwrap(), Published::Placed);
        assert!(final_path.join("depvault.toml").is_file());
        assert!(!staging.exists());
    }

    #[test]
    fn publish_keeps_existing_entry() {
        let temp = TempDir::new().unwrap();
        let final_path = temp.path().join("entry");
        fs::create_dir_all(&final_path).unwrap();
        fs::write(final_path.join("winner"), "1").unwrap();

        let staging = staging_path(temp.path(), "entry");
        sample_tree(&staging);

        assert_eq!(
            publish(&staging, &final_path).unwrap(),
            Published::AlreadyPresent
        );
        assert!(final_path.join("winner").is_file());
        assert!(!staging.exists());
    }

    #[test]
    fn sweep_skips_locked_entries() {
        let temp = TempDir::new().unwrap();
        let busy = staging_path(temp.path(), "busy");
        let stale = staging_path(temp.path(), "stale");
        fs::create_dir_all(&busy).unwrap();
        fs::create_dir_all(&stale).unwrap();

        let _lock = EntryLock::try_acquire(temp.path(), "busy").unwrap().unwrap();
        let removed = sweep_staging(temp.path()).unwrap();

        assert_eq!(removed, vec![stale.clone()]);
        assert!(busy.exists());
        assert!(!stale.exists());
    }

    #[test]
    fn sweep_without_staging_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(sweep_staging(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn sweep_entry_staging_only_touches_that_entry() {
        let temp = TempDir::new().unwrap();
        let mine = staging_path(temp.path(), "mine");
        let other = staging_path(temp.path(), "other");
        fs::create_dir_all(&mine).unwrap();
        fs::create_dir_all(&other).unwrap();

        assert_eq!(sweep_entry_staging(temp.path(), "mine"), 1);
        assert!(!mine.exists());
        assert!(other.exists());
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved(".staging"));
        assert!(is_reserved(".locks"));
        assert!(!is_reserved("hello_1.0.1_filesystem"));
    }
}
