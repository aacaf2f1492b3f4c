// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    symlinks: HashSet<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Paths are used verbatim (no normalisation), so tests should stick to one
/// spelling per path, e.g. `/opt/app/v1/httpd`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        state.entries.insert(path.clone(), MockEntry::File);
        Self::link_into_parent(&mut state, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state, &path);
    }

    /// Mark an existing entry as a symbolic link.
    pub fn mark_symlink(&self, path: impl AsRef<Path>) {
        self.lock().symlinks.insert(path.as_ref().to_path_buf());
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn ensure_dir_entry(state: &mut MockState, path: &Path) {
        if !state.entries.contains_key(path) {
            state
                .entries
                .insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(state, path);
        }
    }

    fn link_into_parent(state: &mut MockState, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent.as_os_str().is_empty() || parent == path {
            return;
        }
        Self::ensure_dir_entry(state, parent);
        if let Some(MockEntry::Dir(children)) = state.entries.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn unlink_from_parent(state: &mut MockState, path: &Path) {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(parent) {
                children.retain(|c| c.as_str() != name);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.lock().symlinks.contains(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("No such file or directory: {:?}", path))
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File) => {
                state.entries.remove(path);
                state.symlinks.remove(path);
                Self::unlink_from_parent(&mut state, path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) if children.is_empty() => {
                state.entries.remove(path);
                state.symlinks.remove(path);
                Self::unlink_from_parent(&mut state, path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Directory not empty: {:?}", path)),
            Some(MockEntry::File) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(anyhow!("Directory not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_are_created_implicitly() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/app/v1/httpd");

        assert!(fs.is_dir(Path::new("/opt/app/v1")));
        assert_eq!(
            fs.read_dir(Path::new("/opt/app")).unwrap(),
            vec![PathBuf::from("/opt/app/v1")]
        );
    }

    #[test]
    fn remove_dir_refuses_non_empty() {
        let fs = MockFileSystem::new();
        fs.add_file("/tmp/x/inner");
        assert!(fs.remove_dir(Path::new("/tmp/x")).is_err());
        fs.remove_file(Path::new("/tmp/x/inner")).unwrap();
        fs.remove_dir(Path::new("/tmp/x")).unwrap();
        assert!(!fs.exists(Path::new("/tmp/x")));
    }
}
