// Folder commands - snippet folders in the sidebar tree

use tracing::debug;

use super::common::{finish, validateName};
use crate::error::{Error, Result};
use crate::models::TreeEntry;
use crate::paths;
use crate::session::SessionState;
use crate::storage::snippetFile;
use crate::tree;

/// Create `name` under `parentPath` ("" is the root). Returns the new path.
pub async fn createFolder(session: &SessionState, parentPath: &str, name: &str) -> Result<String> {
    let outcome = createFolderInner(session, parentPath, name).await;
    finish(session, "createFolder", outcome, |path| format!("Folder '{}' created", paths::fileName(path)))
}

async fn createFolderInner(session: &SessionState, parentPath: &str, name: &str) -> Result<String> {
    let name = validateName(name)?;
    let parent = paths::normalize(parentPath);
    if !parent.is_empty() && !session.backend.exists(&snippetFile(&parent)) {
        return Err(Error::NotFound(format!("Folder {} not found", parent)));
    }
    let path = paths::join(&parent, &name);
    if session.backend.exists(&snippetFile(&path)) {
        return Err(Error::InvalidInput(format!("{} already exists", path)));
    }

    let backend = session.backend.clone();
    let dir = snippetFile(&path);
    session
        .queue
        .enqueue("createFolder", move || async move { backend.createFolder(&dir) })
        .await?;

    let inserted = tree::insert(&mut session.tree.write(), &parent, TreeEntry::folder(&name, &path));
    if !inserted {
        debug!("[createFolder] Parent {} not in tree, reloading", parent);
        session.reloadTree()?;
    }
    Ok(path)
}

/// Flip a folder open/closed. UI state only, so no toast; the expanded set
/// rides along with the next autosave.
pub fn toggleFolder(session: &SessionState, path: &str) -> Option<bool> {
    let expanded = tree::toggleExpanded(&mut session.tree.write(), path)?;
    let current = tree::collectExpanded(&session.tree.read());
    session.uiState.write().expandedFolders = current.into_iter().collect();
    session.triggerAutosave();
    Some(expanded)
}
