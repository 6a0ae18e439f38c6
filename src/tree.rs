// Tree - the in-memory mirror of the snippet store layout
// Always rebuildable from disk with `loadTree`

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Board, Snippet, TreeEntry, CUT_SNIPPETS_FOLDER};
use crate::paths;
use crate::storage::{snippetFile, Backend, SNIPPETS_ROOT};

// ============================================
// LOADING
// ============================================

/// Scan the snippet root into a tree. Unreadable or unparsable files are
/// skipped with a warning rather than failing the whole load.
pub fn loadTree(backend: &dyn Backend) -> Result<Vec<TreeEntry>> {
    if !backend.exists(SNIPPETS_ROOT) {
        debug!("[loadTree] No snippet root yet, empty tree");
        return Ok(Vec::new());
    }
    scanFolder(backend, "")
}

fn scanFolder(backend: &dyn Backend, treePath: &str) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in backend.readDir(&snippetFile(treePath))? {
        if entry.name.starts_with('.') {
            continue;
        }
        let path = paths::join(treePath, &entry.name);

        if entry.isDir {
            entries.push(TreeEntry::Folder {
                name: entry.name.clone(),
                children: scanFolder(backend, &path)?,
                path,
                expanded: false,
            });
            continue;
        }

        match backend.readFile(&snippetFile(&path)) {
            Ok(raw) => {
                if let Some(parsed) = parseEntry(&path, &raw) {
                    entries.push(parsed);
                }
            }
            Err(e) => warn!("[loadTree] Skipping unreadable {}: {}", path, e),
        }
    }

    sortEntries(&mut entries);
    Ok(entries)
}

/// Interpret a file under the snippet root. JSON with a `cards` array is a
/// board, other JSON is a snippet, `.txt` is a plain-text snippet.
pub fn parseEntry(path: &str, raw: &str) -> Option<TreeEntry> {
    let name = paths::fileStem(path).to_string();

    match paths::extension(path).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("json") => {
            let value: serde_json::Value = match serde_json::from_str(raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!("[parseEntry] Invalid JSON in {}: {}", path, e);
                    return None;
                }
            };

            if value.get("cards").is_some_and(|c| c.is_array()) {
                match serde_json::from_value::<Board>(value) {
                    Ok(mut board) => {
                        board.filePath = Some(path.to_string());
                        Some(TreeEntry::Board { name, path: path.to_string(), content: board })
                    }
                    Err(e) => {
                        warn!("[parseEntry] Invalid board file {}: {}", path, e);
                        None
                    }
                }
            } else {
                match serde_json::from_value::<Snippet>(value) {
                    Ok(snippet) => Some(TreeEntry::Snippet { name, path: path.to_string(), content: snippet }),
                    Err(e) => {
                        warn!("[parseEntry] Invalid snippet file {}: {}", path, e);
                        None
                    }
                }
            }
        }
        Some("txt") => Some(TreeEntry::Snippet {
            content: Snippet::fromPlainText(&name, raw),
            name,
            path: path.to_string(),
        }),
        _ => None,
    }
}

/// The cut folder at the root, then folders, then case-insensitive name
pub fn sortEntries(entries: &mut [TreeEntry]) {
    entries.sort_by(|a, b| {
        isCutFolder(b)
            .cmp(&isCutFolder(a))
            .then_with(|| b.isFolder().cmp(&a.isFolder()))
            .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
    });
}

fn isCutFolder(entry: &TreeEntry) -> bool {
    entry.isFolder() && entry.path() == CUT_SNIPPETS_FOLDER
}

// ============================================
// LOOKUP
// ============================================

pub fn find<'a>(tree: &'a [TreeEntry], path: &str) -> Option<&'a TreeEntry> {
    let path = paths::normalize(path);
    for entry in tree {
        if entry.path() == path {
            return Some(entry);
        }
        if entry.isFolder() && paths::isDescendant(&path, entry.path()) {
            return find(entry.children(), &path);
        }
    }
    None
}

pub fn findMut<'a>(tree: &'a mut [TreeEntry], path: &str) -> Option<&'a mut TreeEntry> {
    let path = paths::normalize(path);
    for entry in tree.iter_mut() {
        if entry.path() == path {
            return Some(entry);
        }
        if let TreeEntry::Folder { path: folderPath, children, .. } = entry {
            if paths::isDescendant(&path, folderPath) {
                return findMut(children, &path);
            }
        }
    }
    None
}

/// Children list of a folder ("" is the root)
fn childrenMut<'a>(tree: &'a mut Vec<TreeEntry>, folderPath: &str) -> Option<&'a mut Vec<TreeEntry>> {
    if folderPath.is_empty() {
        return Some(tree);
    }
    match findMut(tree, folderPath) {
        Some(TreeEntry::Folder { children, .. }) => Some(children),
        _ => None,
    }
}

pub fn walk<'a>(tree: &'a [TreeEntry], visit: &mut dyn FnMut(&'a TreeEntry)) {
    for entry in tree {
        visit(entry);
        walk(entry.children(), visit);
    }
}

pub fn snippetEntries(tree: &[TreeEntry]) -> Vec<(String, Snippet)> {
    let mut out = Vec::new();
    walk(tree, &mut |entry| {
        if let TreeEntry::Snippet { path, content, .. } = entry {
            out.push((path.clone(), content.clone()));
        }
    });
    out
}

pub fn boardEntries(tree: &[TreeEntry]) -> Vec<(String, Board)> {
    let mut out = Vec::new();
    walk(tree, &mut |entry| {
        if let TreeEntry::Board { path, content, .. } = entry {
            out.push((path.clone(), content.clone()));
        }
    });
    out
}

// ============================================
// MUTATION
// ============================================

/// Insert `entry` into the folder at `parentPath`, replacing an entry with
/// the same path. Returns false when the parent is not a known folder.
pub fn insert(tree: &mut Vec<TreeEntry>, parentPath: &str, entry: TreeEntry) -> bool {
    let parentPath = paths::normalize(parentPath);
    let Some(children) = childrenMut(tree, &parentPath) else {
        return false;
    };
    children.retain(|e| e.path() != entry.path());
    children.push(entry);
    sortEntries(children);
    true
}

/// Insert at the very top of the root level (reserved folders)
pub fn insertAtTop(tree: &mut Vec<TreeEntry>, entry: TreeEntry) {
    tree.retain(|e| e.path() != entry.path());
    tree.insert(0, entry);
}

pub fn remove(tree: &mut Vec<TreeEntry>, path: &str) -> Option<TreeEntry> {
    let path = paths::normalize(path);
    let children = childrenMut(tree, paths::parent(&path))?;
    let idx = children.iter().position(|e| e.path() == path)?;
    Some(children.remove(idx))
}

/// Replace the snippet stored at `path`
pub fn updateSnippet(tree: &mut [TreeEntry], path: &str, snippet: Snippet) -> bool {
    match findMut(tree, path) {
        Some(TreeEntry::Snippet { content, .. }) => {
            *content = snippet;
            true
        }
        _ => false,
    }
}

// ============================================
// EXPANDED STATE
// ============================================

pub fn collectExpanded(tree: &[TreeEntry]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk(tree, &mut |entry| {
        if let TreeEntry::Folder { path, expanded: true, .. } = entry {
            out.insert(path.clone());
        }
    });
    out
}

pub fn applyExpanded(tree: &mut [TreeEntry], expandedPaths: &BTreeSet<String>) {
    for entry in tree.iter_mut() {
        if let TreeEntry::Folder { path, children, expanded, .. } = entry {
            *expanded = expandedPaths.contains(path.as_str());
            applyExpanded(children, expandedPaths);
        }
    }
}

/// Carry expanded paths across a folder relocation
pub fn rebaseExpanded(expandedPaths: &BTreeSet<String>, oldFolder: &str, newFolder: &str) -> BTreeSet<String> {
    expandedPaths
        .iter()
        .map(|p| paths::rebase(p, oldFolder, newFolder).unwrap_or_else(|| p.clone()))
        .collect()
}

/// Flip a folder's expanded flag. Returns the new state.
pub fn toggleExpanded(tree: &mut [TreeEntry], path: &str) -> Option<bool> {
    match findMut(tree, path) {
        Some(TreeEntry::Folder { expanded, .. }) => {
            *expanded = !*expanded;
            Some(*expanded)
        }
        _ => None,
    }
}
