// src/cleanup.rs

//! Best-effort removal of stale temp entries left by a previous run.

use std::path::Path;

use tracing::{debug, info};

use crate::fs::FileSystem;

/// Remove every direct entry of `tempdir` whose name contains `binary`.
///
/// Each entry is removed as a file, falling back to (empty) directory
/// removal. Failures are logged at debug and otherwise ignored. Returns the
/// number of entries actually removed; a missing or unreadable `tempdir`
/// yields 0.
pub fn clean_temp_files(fs: &dyn FileSystem, tempdir: &Path, binary: &str) -> usize {
    let entries = match fs.read_dir(tempdir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(tempdir = ?tempdir, error = %err, "temp dir not readable; nothing to clean");
            return 0;
        }
    };

    let mut removed = 0;
    for path in entries {
        let matches = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(binary));
        if !matches {
            continue;
        }

        let result = fs.remove_file(&path).or_else(|file_err| {
            debug!(path = ?path, error = %file_err, "not removable as file; trying directory");
            fs.remove_dir(&path)
        });
        match result {
            Ok(()) => removed += 1,
            Err(err) => debug!(path = ?path, error = %err, "failed to remove temp entry"),
        }
    }

    info!(count = removed, tempdir = ?tempdir, "removed {removed} temp files");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn removes_matching_files_and_empty_dirs_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/app/temp/httpd.pid");
        fs.add_file("/app/temp/other.lock");
        fs.add_dir("/app/temp/httpd-cache");
        fs.add_file("/app/temp/httpd-full/data");

        let removed = clean_temp_files(&fs, Path::new("/app/temp"), "httpd");

        assert_eq!(removed, 2);
        assert!(!fs.exists(Path::new("/app/temp/httpd.pid")));
        assert!(!fs.exists(Path::new("/app/temp/httpd-cache")));
        assert!(fs.exists(Path::new("/app/temp/httpd-full/data")));
        assert!(fs.exists(Path::new("/app/temp/other.lock")));
    }

    #[test]
    fn missing_tempdir_is_not_an_error() {
        let fs = MockFileSystem::new();
        assert_eq!(clean_temp_files(&fs, Path::new("/app/temp"), "httpd"), 0);
    }
}
