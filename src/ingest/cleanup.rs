//! Best-effort recursive delete for the clone staging area.
//!
//! Each entry gets one retry after its write protection (and that of its
//! containing directory) is relaxed. Entries that still refuse to go are
//! logged and left in place; the walk always continues.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// What a cleanup pass managed to remove
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Entries (files, links and directories) removed
    pub removed: usize,
    /// Entries that survived both attempts
    pub failed: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes a single entry; directories are empty by the time they are passed
type RemoveFn<'a> = &'a dyn Fn(&Path, bool) -> io::Result<()>;

fn remove_from_disk(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

/// Remove `path` and everything below it. A missing path is a no-op.
pub fn force_remove_dir(path: &Path) -> CleanupReport {
    force_remove_with(path, &remove_from_disk)
}

fn force_remove_with(path: &Path, remove: RemoveFn<'_>) -> CleanupReport {
    let mut report = CleanupReport::default();

    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!("Could not inspect {}: {}", path.display(), e);
            report.failed.push(path.to_path_buf());
            return report;
        }
    };

    if metadata.is_dir() {
        remove_tree(path, remove, &mut report);
    } else {
        remove_entry(path, false, remove, &mut report);
    }

    debug!(
        "Cleanup of {}: {} removed, {} failed",
        path.display(),
        report.removed,
        report.failed.len()
    );
    report
}

fn remove_tree(dir: &Path, remove: RemoveFn<'_>, report: &mut CleanupReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(first) => {
            debug!("Listing {} failed ({}), relaxing permissions", dir.display(), first);
            relax_protection(dir);
            match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Could not delete {}: {}", dir.display(), e);
                    report.failed.push(dir.to_path_buf());
                    return;
                }
            }
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let path = entry.path();
        // file_type() does not follow symlinks, so linked directories are unlinked, not walked
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            remove_tree(&path, remove, report);
        } else {
            remove_entry(&path, false, remove, report);
        }
    }

    remove_entry(dir, true, remove, report);
}

fn remove_entry(path: &Path, is_dir: bool, remove: RemoveFn<'_>, report: &mut CleanupReport) {
    let attempt = || remove(path, is_dir);

    match attempt() {
        Ok(()) => report.removed += 1,
        Err(first) => {
            debug!("Delete of {} failed ({}), retrying", path.display(), first);
            relax_protection(path);
            match attempt() {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!("Could not delete {}: {}", path.display(), e);
                    report.failed.push(path.to_path_buf());
                }
            }
        }
    }
}

/// Make the entry and its parent writable by the owner
fn relax_protection(path: &Path) {
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    // set_permissions follows links; never touch a link target
    if !is_link {
        make_writable(path);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        make_writable(parent);
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mut perms = metadata.permissions();
    let extra = if metadata.is_dir() { 0o700 } else { 0o200 };
    perms.set_mode(perms.mode() | extra);
    if let Err(e) = fs::set_permissions(path, perms) {
        debug!("Could not relax permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) {
    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mut perms = metadata.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        if let Err(e) = fs::set_permissions(path, perms) {
            debug!("Could not clear read-only flag on {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_readonly(path: &Path) {
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_missing_path_is_noop() {
        let temp = TempDir::new().unwrap();
        let report = force_remove_dir(&temp.path().join("does-not-exist"));
        assert!(report.is_clean());
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn test_removes_nested_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        fs::create_dir_all(root.join("src/deep")).unwrap();
        fs::write(root.join("README.md"), "hi").unwrap();
        fs::write(root.join("src/deep/main.py"), "print(1)").unwrap();

        let report = force_remove_dir(&root);

        assert!(report.is_clean());
        // two files + deep + src + repo
        assert_eq!(report.removed, 5);
        assert!(!root.exists());
    }

    #[test]
    fn test_removes_read_only_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        let objects = root.join(".git/objects");
        fs::create_dir_all(&objects).unwrap();
        let pack = objects.join("pack-1234.idx");
        fs::write(&pack, "binary").unwrap();

        set_readonly(&pack);
        set_readonly(&objects);

        let report = force_remove_dir(&root);

        assert!(report.is_clean(), "failed: {:?}", report.failed);
        assert!(!root.exists());
    }

    #[test]
    fn test_undeletable_entry_is_reported_and_walk_continues() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        let pinned = root.join("locked/pinned.idx");
        fs::create_dir_all(root.join("locked")).unwrap();
        fs::write(&pinned, "binary").unwrap();
        fs::write(root.join("locked/other.py"), "x").unwrap();
        fs::write(root.join("sibling.py"), "y").unwrap();

        let attempts = std::cell::Cell::new(0);
        let remove = |path: &Path, is_dir: bool| {
            if path == pinned {
                attempts.set(attempts.get() + 1);
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "pinned"));
            }
            remove_from_disk(path, is_dir)
        };

        let report = force_remove_with(&root, &remove);

        // One retry after relaxing, then give up
        assert_eq!(attempts.get(), 2);
        assert!(report.failed.contains(&pinned));
        // Its directories stay because they are not empty
        assert!(report.failed.contains(&root.join("locked")));
        assert!(report.failed.contains(&root));
        assert!(!root.join("sibling.py").exists());
        assert!(!root.join("locked/other.py").exists());
        assert!(pinned.exists());
        assert_eq!(report.removed, 2);
    }

    #[test]
    fn test_single_file_target() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("stray.txt");
        fs::write(&file, "x").unwrap();

        let report = force_remove_dir(&file);
        assert_eq!(report.removed, 1);
        assert!(!file.exists());
    }
}
