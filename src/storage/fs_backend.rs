// Filesystem backend - maps store paths onto a root directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{missing, Backend, DirEntry};
use crate::error::Result;
use crate::paths;

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let normalized = paths::normalize(path);
        let mut full = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty() && *s != "..") {
            full.push(segment);
        }
        full
    }
}

impl Backend for FsBackend {
    fn readFile(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(missing(path));
        }
        Ok(fs::read_to_string(full)?)
    }

    fn writeFile(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write to a sibling temp file first so readers never see a partial file
        let tmp = full.with_extension("tmp-write");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &full)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn rename(&self, oldPath: &str, newPath: &str) -> Result<()> {
        let from = self.resolve(oldPath);
        if !from.exists() {
            return Err(missing(oldPath));
        }
        debug!("[FsBackend::rename] {:?} -> {:?}", from, self.resolve(newPath));
        fs::rename(from, self.resolve(newPath))?;
        Ok(())
    }

    fn createFolder(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(path))?;
        Ok(())
    }

    fn removeFile(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(missing(path));
        }
        fs::remove_file(full)?;
        Ok(())
    }

    fn deleteFolderRecursive(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if !full.is_dir() {
            return Err(missing(path));
        }
        fs::remove_dir_all(full)?;
        Ok(())
    }

    fn readDir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let full = self.resolve(path);
        if !full.is_dir() {
            return Err(missing(path));
        }

        let mut entries: Vec<DirEntry> = fs::read_dir(full)?
            .filter_map(|e| e.ok())
            .map(|e| DirEntry {
                name: e.file_name().to_string_lossy().to_string(),
                isDir: e.path().is_dir(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn listFiles(&self, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(path);
        if !full.is_dir() {
            return Err(missing(path));
        }

        let mut files: Vec<String> = WalkDir::new(&full)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&full)
                    .ok()
                    .map(|rel| paths::normalize(&rel.to_string_lossy()))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
