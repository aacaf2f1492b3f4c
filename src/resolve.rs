// src/resolve.rs

//! Locate the target executable beneath a base directory.
//!
//! Every file whose *file name* matches the shell glob `*NAME*`
//! (case-sensitive) is a candidate. Candidates are compared as plain path
//! strings and the lexicographically last one wins, which picks the "newest"
//! entry when paths embed sortable version or date components
//! (`/opt/app/v2/httpd` over `/opt/app/v1/httpd`). No version-aware
//! comparison and no executable-bit check is made; a bad pick surfaces later
//! as a spawn error.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::errors::{Result, ShrinkwrapError};
use crate::fs::FileSystem;

/// The concrete path chosen for the configured binary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    path: PathBuf,
}

impl ResolvedBinary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the resolved binary, used to name workers.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

impl fmt::Display for ResolvedBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Resolve `name` to a file beneath `basedir` (recursive).
///
/// `basedir` is canonicalised first, so the returned path is absolute.
/// Symlinked directories are listed but not descended into; unreadable
/// sub-directories are skipped.
pub fn resolve_binary(fs: &dyn FileSystem, name: &str, basedir: &Path) -> Result<ResolvedBinary> {
    let matcher = name_matcher(name)?;
    let root = fs.canonicalize(basedir)?;

    let mut candidates = collect_candidates(fs, &root, &matcher)?;
    debug!(binary = %name, ?candidates, "binary candidates");

    candidates.sort();
    match candidates.pop() {
        Some(path) => Ok(ResolvedBinary::new(path)),
        None => Err(ShrinkwrapError::BinaryNotFound {
            name: name.to_string(),
            basedir: basedir.to_path_buf(),
        }),
    }
}

fn name_matcher(name: &str) -> Result<GlobMatcher> {
    let pattern = format!("*{name}*");
    let glob = Glob::new(&pattern).with_context(|| format!("invalid binary pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Walk `root` and return the full path of every matching file, as strings
/// so that sorting is plain lexicographic.
fn collect_candidates(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &GlobMatcher,
) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir != root => {
                debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        for path in entries {
            if fs.is_dir(&path) {
                if !fs.is_symlink(&path) {
                    stack.push(path);
                }
            } else if fs.is_file(&path) {
                let matches = path
                    .file_name()
                    .is_some_and(|file_name| matcher.is_match(file_name));
                if matches {
                    found.push(path.to_string_lossy().into_owned());
                }
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn picks_lexicographically_last_match() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/app/v1/httpd");
        fs.add_file("/opt/app/v2/httpd");
        fs.add_file("/opt/app/v2/README");

        let resolved = resolve_binary(&fs, "httpd", Path::new("/opt/app")).unwrap();
        assert_eq!(resolved.path(), Path::new("/opt/app/v2/httpd"));
        assert_eq!(resolved.name(), "httpd");
    }

    #[test]
    fn matches_on_file_name_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/httpd/bin/server");

        let err = resolve_binary(&fs, "httpd", Path::new("/opt")).unwrap_err();
        assert!(matches!(err, ShrinkwrapError::BinaryNotFound { name, .. } if name == "httpd"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/app/HTTPD");

        assert!(resolve_binary(&fs, "httpd", Path::new("/opt/app")).is_err());
        assert!(resolve_binary(&fs, "HTTP", Path::new("/opt/app")).is_ok());
    }

    #[test]
    fn symlinked_directories_are_not_descended() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/app/v1/httpd");
        fs.add_file("/opt/app/zz-link/httpd");
        fs.mark_symlink("/opt/app/zz-link");

        let resolved = resolve_binary(&fs, "httpd", Path::new("/opt/app")).unwrap();
        assert_eq!(resolved.path(), Path::new("/opt/app/v1/httpd"));
    }

    #[test]
    fn missing_basedir_is_an_error() {
        let fs = MockFileSystem::new();
        assert!(resolve_binary(&fs, "httpd", Path::new("/nope")).is_err());
    }
}
