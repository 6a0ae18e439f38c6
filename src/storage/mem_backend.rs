// In-memory backend - used by tests and headless sessions

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{missing, Backend, DirEntry};
use crate::error::{Error, Result};
use crate::paths;

#[derive(Default)]
struct MemTree {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemTree {
    fn isDir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn addDirChain(&mut self, path: &str) {
        let mut current = path.to_string();
        while !current.is_empty() {
            self.dirs.insert(current.clone());
            current = paths::parent(&current).to_string();
        }
    }
}

/// Files and folders kept in ordered maps.
///
/// Failure switches let tests exercise the error paths of the sync
/// protocols: `setSimulateWriteError` makes every mutation fail and
/// `setSilentRename` makes `rename` report success without moving
/// anything.
#[derive(Default)]
pub struct MemBackend {
    tree: RwLock<MemTree>,
    simulateWriteError: AtomicBool,
    silentRename: AtomicBool,
    mutations: AtomicUsize,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setSimulateWriteError(&self, simulate: bool) {
        self.simulateWriteError.store(simulate, Ordering::SeqCst);
    }

    pub fn setSilentRename(&self, silent: bool) {
        self.silentRename.store(silent, Ordering::SeqCst);
    }

    /// Number of mutating calls made so far (successful or not)
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn beginMutation(&self) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.simulateWriteError.load(Ordering::SeqCst) {
            return Err(Error::Store("Simulated write error".to_string()));
        }
        Ok(())
    }
}

impl Backend for MemBackend {
    fn readFile(&self, path: &str) -> Result<String> {
        let path = paths::normalize(path);
        self.tree.read().files.get(&path).cloned().ok_or_else(|| missing(&path))
    }

    fn writeFile(&self, path: &str, content: &str) -> Result<()> {
        self.beginMutation()?;
        let path = paths::normalize(path);
        let mut tree = self.tree.write();
        if tree.dirs.contains(&path) {
            return Err(Error::Store(format!("{} is a folder", path)));
        }
        tree.addDirChain(paths::parent(&path));
        tree.files.insert(path, content.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        let tree = self.tree.read();
        tree.files.contains_key(&path) || tree.isDir(&path)
    }

    fn rename(&self, oldPath: &str, newPath: &str) -> Result<()> {
        self.beginMutation()?;
        let oldPath = paths::normalize(oldPath);
        let newPath = paths::normalize(newPath);
        let mut tree = self.tree.write();

        if !tree.isDir(paths::parent(&newPath)) {
            return Err(missing(paths::parent(&newPath)));
        }
        if self.silentRename.load(Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(content) = tree.files.remove(&oldPath) {
            tree.files.insert(newPath, content);
            return Ok(());
        }

        if !tree.dirs.contains(&oldPath) {
            return Err(missing(&oldPath));
        }

        let movedFiles: Vec<String> = tree
            .files
            .keys()
            .filter(|p| paths::isWithin(p, &oldPath))
            .cloned()
            .collect();
        for path in movedFiles {
            if let (Some(content), Some(target)) = (tree.files.remove(&path), paths::rebase(&path, &oldPath, &newPath)) {
                tree.files.insert(target, content);
            }
        }

        let movedDirs: Vec<String> = tree
            .dirs
            .iter()
            .filter(|p| paths::isWithin(p, &oldPath))
            .cloned()
            .collect();
        for path in movedDirs {
            tree.dirs.remove(&path);
            if let Some(target) = paths::rebase(&path, &oldPath, &newPath) {
                tree.dirs.insert(target);
            }
        }
        Ok(())
    }

    fn createFolder(&self, path: &str) -> Result<()> {
        self.beginMutation()?;
        let path = paths::normalize(path);
        let mut tree = self.tree.write();
        if tree.files.contains_key(&path) {
            return Err(Error::Store(format!("{} is a file", path)));
        }
        tree.addDirChain(&path);
        Ok(())
    }

    fn removeFile(&self, path: &str) -> Result<()> {
        self.beginMutation()?;
        let path = paths::normalize(path);
        match self.tree.write().files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(missing(&path)),
        }
    }

    fn deleteFolderRecursive(&self, path: &str) -> Result<()> {
        self.beginMutation()?;
        let path = paths::normalize(path);
        let mut tree = self.tree.write();
        if path.is_empty() || !tree.dirs.contains(&path) {
            return Err(missing(&path));
        }
        tree.files.retain(|p, _| !paths::isWithin(p, &path));
        tree.dirs.retain(|p| !paths::isWithin(p, &path));
        Ok(())
    }

    fn readDir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = paths::normalize(path);
        let tree = self.tree.read();
        if !tree.isDir(&path) {
            return Err(missing(&path));
        }

        let mut entries: Vec<DirEntry> = tree
            .dirs
            .iter()
            .filter(|p| paths::parent(p) == path)
            .map(|p| DirEntry { name: paths::fileName(p).to_string(), isDir: true })
            .chain(
                tree.files
                    .keys()
                    .filter(|p| paths::parent(p) == path)
                    .map(|p| DirEntry { name: paths::fileName(p).to_string(), isDir: false }),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn listFiles(&self, path: &str) -> Result<Vec<String>> {
        let path = paths::normalize(path);
        let tree = self.tree.read();
        if !tree.isDir(&path) {
            return Err(missing(&path));
        }
        Ok(tree
            .files
            .keys()
            .filter(|p| paths::isDescendant(p, &path) || path.is_empty())
            .filter_map(|p| if path.is_empty() { Some(p.clone()) } else { paths::rebase(p, &path, "") })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_rename_moves_contents() {
        let backend = MemBackend::new();
        backend.writeFile("s/a/x.json", "1").unwrap();
        backend.writeFile("s/a/deep/y.json", "2").unwrap();
        backend.createFolder("s/b").unwrap();

        backend.rename("s/a", "s/b/a").unwrap();

        assert!(!backend.exists("s/a"));
        assert_eq!(backend.readFile("s/b/a/x.json").unwrap(), "1");
        assert_eq!(backend.readFile("s/b/a/deep/y.json").unwrap(), "2");
        assert!(backend.exists("s/b/a/deep"));
    }

    #[test]
    fn test_rename_requires_destination_parent() {
        let backend = MemBackend::new();
        backend.writeFile("s/x.json", "1").unwrap();
        assert!(backend.rename("s/x.json", "missing/x.json").is_err());
        assert!(backend.exists("s/x.json"));
    }

    #[test]
    fn test_simulated_write_error_counts_mutation() {
        let backend = MemBackend::new();
        backend.setSimulateWriteError(true);
        assert!(backend.writeFile("x.json", "1").is_err());
        assert_eq!(backend.mutations(), 1);
        assert!(!backend.exists("x.json"));
    }

    #[test]
    fn test_list_and_read_dir() {
        let backend = MemBackend::new();
        backend.writeFile("s/a/x.json", "1").unwrap();
        backend.writeFile("s/y.json", "2").unwrap();

        assert_eq!(backend.listFiles("s").unwrap(), vec!["a/x.json", "y.json"]);
        let names: Vec<String> = backend.readDir("s").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "y.json"]);
    }

    #[test]
    fn test_delete_folder_recursive() {
        let backend = MemBackend::new();
        backend.writeFile("s/a/x.json", "1").unwrap();
        backend.writeFile("s/ab.json", "2").unwrap();
        backend.deleteFolderRecursive("s/a").unwrap();
        assert!(!backend.exists("s/a/x.json"));
        assert!(backend.exists("s/ab.json"));
    }
}
