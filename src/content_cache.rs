// Content cache - path-keyed snippet content
// The one answer to "what text does path P hold right now"

use std::collections::{HashMap, HashSet};

use crate::models::Snippet;
use crate::paths;

#[derive(Debug, Default, Clone)]
pub struct ContentCache {
    entries: HashMap<String, Snippet>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Snippet> {
        self.entries.get(&paths::normalize(path))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Snippet> {
        self.entries.get_mut(&paths::normalize(path))
    }

    /// Text held at `path`, if any
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).map(|s| s.text.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&paths::normalize(path))
    }

    /// Insert or replace; returns the previous value
    pub fn insert(&mut self, path: &str, snippet: Snippet) -> Option<Snippet> {
        self.entries.insert(paths::normalize(path), snippet)
    }

    pub fn remove(&mut self, path: &str) -> Option<Snippet> {
        self.entries.remove(&paths::normalize(path))
    }

    /// Move the value at `oldPath` to `newPath`. Returns false when there
    /// was nothing under `oldPath`.
    pub fn renameKey(&mut self, oldPath: &str, newPath: &str) -> bool {
        match self.entries.remove(&paths::normalize(oldPath)) {
            Some(snippet) => {
                self.entries.insert(paths::normalize(newPath), snippet);
                true
            }
            None => false,
        }
    }

    /// Rebase every key inside `oldFolder` onto `newFolder`
    pub fn renamePrefix(&mut self, oldFolder: &str, newFolder: &str) -> usize {
        let moved: Vec<(String, String)> = self
            .entries
            .keys()
            .filter_map(|key| paths::rebase(key, oldFolder, newFolder).map(|target| (key.clone(), target)))
            .filter(|(key, target)| key != target)
            .collect();

        for (key, target) in &moved {
            if let Some(snippet) = self.entries.remove(key) {
                self.entries.insert(target.clone(), snippet);
            }
        }
        moved.len()
    }

    /// Drop every key inside `folder`
    pub fn removePrefix(&mut self, folder: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !paths::isWithin(key, folder));
        before - self.entries.len()
    }

    /// Drop every key not in `keep` (store-relative, normalized). Returns
    /// how many were dropped.
    pub fn retainPaths(&mut self, keep: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| keep.contains(key));
        before - self.entries.len()
    }

    /// Keys that are segment-aligned suffixes of `path`. Used to map legacy
    /// absolute card paths back onto store-relative keys.
    pub fn findBySuffix(&self, path: &str) -> Vec<&str> {
        let mut matches: Vec<&str> = self
            .entries
            .keys()
            .filter(|key| paths::endsWithPath(path, key))
            .map(String::as_str)
            .collect();
        matches.sort();
        matches
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
