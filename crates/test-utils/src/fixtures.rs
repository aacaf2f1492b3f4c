//! On-disk fixtures for tests that start real child processes.
//!
//! The "binary" is a symlink to `/bin/sh` inside a temp base directory, and
//! the behaviour comes from a script passed as its first argument. Scripts
//! are never executed directly, so there is no risk of `ETXTBSY` from a file
//! that was just written.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temp base directory containing one shell "binary" and its scripts.
pub struct ShellFixture {
    dir: TempDir,
    binary: PathBuf,
}

impl ShellFixture {
    /// Create `<tmp>/bin/<name>` as a symlink to `/bin/sh`.
    #[cfg(unix)]
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).expect("create bin dir");
        let binary = bin.join(name);
        std::os::unix::fs::symlink("/bin/sh", &binary).expect("symlink /bin/sh");
        Self { dir, binary }
    }

    pub fn basedir(&self) -> &Path {
        self.dir.path()
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Write a script under `<tmp>/scripts/` and return its path as a string.
    pub fn script(&self, file: &str, body: &str) -> String {
        let scripts = self.dir.path().join("scripts");
        fs::create_dir_all(&scripts).expect("create scripts dir");
        let path = scripts.join(file);
        fs::write(&path, body).expect("write script");
        path.display().to_string()
    }
}
