// Reference sync - move / rename / delete protocols
// Keeps disk, tree, content cache and card references pointing at the same paths
//
// Order of every relocation: disk (ensure folder, rename, verify) -> cache
// keys -> card references -> persist boards -> reload tree from disk.
// Steps are not atomic; the tree reload and the orphan sweep converge state.

use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use crate::commands::common::validateName;
use crate::error::{Error, Result};
use crate::models::{TreeEntry, DEFAULT_BOARD_ID};
use crate::paths;
use crate::session::{Session, SessionState};
use crate::storage::snippetFile;
use crate::tree;
use crate::ui::ToastKind;

/// Result of a relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// Source and destination were the same; nothing touched
    Unchanged,
    Moved {
        from: String,
        to: String,
        /// Card references rewritten across all boards
        cardsUpdated: usize,
    },
}

// ============================================
// PUBLIC PROTOCOLS
// ============================================

/// Move a snippet file into another folder
pub async fn moveSnippet(session: &SessionState, sourcePath: &str, targetFolderPath: &str) -> Result<Relocation> {
    let source = paths::normalize(sourcePath);
    let destination = paths::join(targetFolderPath, paths::fileName(&source));
    let outcome = relocateSnippet(session, &source, &destination).await;
    report(session, "moveSnippet", outcome, "Snippet moved")
}

pub async fn renameSnippet(session: &SessionState, path: &str, newName: &str) -> Result<Relocation> {
    let source = paths::normalize(path);
    let outcome = match renamedFile(&source, newName) {
        Ok(destination) => relocateSnippet(session, &source, &destination).await,
        Err(e) => Err(e),
    };
    report(session, "renameSnippet", outcome, "Snippet renamed")
}

/// Move a board file into another folder
pub async fn moveBoard(session: &SessionState, sourcePath: &str, targetFolderPath: &str) -> Result<Relocation> {
    let source = paths::normalize(sourcePath);
    let destination = paths::join(targetFolderPath, paths::fileName(&source));
    let outcome = relocateBoard(session, &source, &destination).await;
    report(session, "moveBoard", outcome, "Board moved")
}

pub async fn renameBoardFile(session: &SessionState, path: &str, newName: &str) -> Result<Relocation> {
    let source = paths::normalize(path);
    let outcome = match renamedFile(&source, newName) {
        Ok(destination) => relocateBoard(session, &source, &destination).await,
        Err(e) => Err(e),
    };
    report(session, "renameBoardFile", outcome, "Board file renamed")
}

/// Move a folder (and everything under it) into another folder
pub async fn moveFolder(session: &SessionState, sourcePath: &str, targetFolderPath: &str) -> Result<Relocation> {
    let source = paths::normalize(sourcePath);
    let target = paths::normalize(targetFolderPath);

    let outcome = if paths::isDescendant(&target, &source) {
        Err(Error::InvalidInput(format!("Cannot move folder '{}' into its own subfolder", source)))
    } else if target == source {
        Ok(Relocation::Unchanged)
    } else {
        let destination = paths::join(&target, paths::fileName(&source));
        relocateFolder(session, &source, &destination).await
    };
    report(session, "moveFolder", outcome, "Folder moved")
}

pub async fn renameFolder(session: &SessionState, path: &str, newName: &str) -> Result<Relocation> {
    let source = paths::normalize(path);
    let outcome = match validateName(newName) {
        Ok(name) => relocateFolder(session, &source, &paths::join(paths::parent(&source), &name)).await,
        Err(e) => Err(e),
    };
    report(session, "renameFolder", outcome, "Folder renamed")
}

/// Delete a snippet file. Cards that referenced it become orphans.
/// `Ok(false)` when the user declined the confirmation.
pub async fn deleteSnippet(session: &SessionState, path: &str) -> Result<bool> {
    let path = paths::normalize(path);
    let outcome = deleteSnippetInner(session, &path).await;
    reportDelete(session, "deleteSnippet", outcome)
}

/// Delete a board and its file. The default board is never deleted.
pub async fn deleteBoardFile(session: &SessionState, boardId: &str, path: &str) -> Result<bool> {
    let path = paths::normalize(path);
    let outcome = deleteBoardInner(session, boardId, &path).await;
    reportDelete(session, "deleteBoardFile", outcome)
}

/// Delete a folder with everything inside it
pub async fn deleteFolder(session: &SessionState, path: &str) -> Result<bool> {
    let path = paths::normalize(path);
    let outcome = deleteFolderInner(session, &path).await;
    reportDelete(session, "deleteFolder", outcome)
}

// ============================================
// RELOCATION
// ============================================

async fn relocateSnippet(session: &SessionState, source: &str, destination: &str) -> Result<Relocation> {
    let destination = paths::normalize(destination);
    if source == destination {
        return Ok(Relocation::Unchanged);
    }
    // Folders and board files have their own protocols
    let isSnippet = session.content.read().contains(source)
        || matches!(tree::find(&session.tree.read(), source), Some(TreeEntry::Snippet { .. }));
    if !isSnippet {
        return Err(Error::InvalidInput(format!("{} is not a snippet", source)));
    }
    checkRelocation(session, source, &destination)?;

    let expanded = tree::collectExpanded(&session.tree.read());
    debug!("[relocateSnippet] {} -> {}", source, destination);

    // 1-3: ensure folder, rename, verify
    relocateOnDisk(session, source, &destination).await?;

    // 4: cache key
    if !session.content.write().renameKey(source, &destination) {
        debug!("[relocateSnippet] {} was not cached", source);
    }

    // 5: card references
    let cardsUpdated = rewriteCardPaths(session, |p| paths::samePath(p, source).then(|| destination.clone()));

    let stale = countCards(session, |p| paths::samePath(p, source));
    if stale > 0 || session.content.read().contains(source) {
        return Err(Error::Integrity(format!(
            "{} still referenced after move ({} cards)",
            source, stale
        )));
    }

    // 6: persist boards when references changed
    if cardsUpdated > 0 {
        session.saveEverything().await?;
    }

    // 7: tree from disk
    reloadTreeSoft(session, &expanded);
    session.refreshCompiledPrompt(true);

    Ok(Relocation::Moved {
        from: source.to_string(),
        to: destination,
        cardsUpdated,
    })
}

async fn relocateBoard(session: &SessionState, source: &str, destination: &str) -> Result<Relocation> {
    let destination = paths::normalize(destination);
    if source == destination {
        return Ok(Relocation::Unchanged);
    }

    let boardId = boardIdForFile(session, source)
        .ok_or_else(|| Error::NotFound(format!("No board stored at {}", source)))?;
    checkRelocation(session, source, &destination)?;

    let expanded = tree::collectExpanded(&session.tree.read());
    debug!("[relocateBoard] {} ({}) -> {}", source, boardId, destination);

    relocateOnDisk(session, source, &destination).await?;

    // The board keeps its id; only where it is stored changes
    let updated = session.withBoardMut(&boardId, |board| board.filePath = Some(destination.clone()));
    if updated.is_none() {
        return Err(Error::Integrity(format!("Board {} vanished during move", boardId)));
    }

    session.saveEverything().await?;
    reloadTreeSoft(session, &expanded);

    Ok(Relocation::Moved {
        from: source.to_string(),
        to: destination,
        cardsUpdated: 0,
    })
}

async fn relocateFolder(session: &SessionState, source: &str, destination: &str) -> Result<Relocation> {
    let destination = paths::normalize(destination);
    if source.is_empty() {
        return Err(Error::InvalidInput("The snippet root cannot be moved".to_string()));
    }
    if source == destination {
        return Ok(Relocation::Unchanged);
    }
    if paths::isDescendant(&destination, source) {
        return Err(Error::InvalidInput(format!("Cannot move folder '{}' into its own subfolder", source)));
    }
    if tree::find(&session.tree.read(), source).is_some_and(|entry| !entry.isFolder()) {
        return Err(Error::InvalidInput(format!("{} is not a folder", source)));
    }
    checkRelocation(session, source, &destination)?;

    let expanded = tree::collectExpanded(&session.tree.read());
    debug!("[relocateFolder] {} -> {}", source, destination);

    relocateOnDisk(session, source, &destination).await?;

    let cachedMoved = session.content.write().renamePrefix(source, &destination);

    // Prefix rewrite must keep the suffix exactly or references break silently
    let cardsUpdated = rewriteCardPaths(session, |p| {
        if paths::isWithin(p, source) {
            paths::rebase(p, source, &destination)
        } else {
            None
        }
    });

    let boardsMoved = {
        let mut boards = session.boards.write();
        let mut moved = 0;
        for board in boards.iter_mut() {
            if let Some(newPath) = board.filePath.as_deref().and_then(|p| paths::rebase(p, source, &destination)) {
                board.filePath = Some(newPath);
                moved += 1;
            }
        }
        moved
    };

    let stale = countCards(session, |p| paths::isWithin(p, source));
    let staleCache = session
        .content
        .read()
        .paths()
        .iter()
        .filter(|p| paths::isWithin(p, source))
        .count();
    if stale > 0 || staleCache > 0 {
        return Err(Error::Integrity(format!(
            "{} still referenced after move ({} cards, {} cache entries)",
            source, stale, staleCache
        )));
    }

    info!(
        "[relocateFolder] Rebased {} snippets, {} cards, {} board files",
        cachedMoved, cardsUpdated, boardsMoved
    );

    session.compiler.lock().clear();
    session.saveEverything().await?;

    let expanded = tree::rebaseExpanded(&expanded, source, &destination);
    reloadTreeSoft(session, &expanded);
    session.refreshCompiledPrompt(true);

    Ok(Relocation::Moved {
        from: source.to_string(),
        to: destination,
        cardsUpdated,
    })
}

/// Shared preconditions: source exists, destination is free
fn checkRelocation(session: &Session, source: &str, destination: &str) -> Result<()> {
    if !session.backend.exists(&snippetFile(source)) {
        return Err(Error::NotFound(format!("{} does not exist", source)));
    }
    if session.backend.exists(&snippetFile(destination)) {
        return Err(Error::InvalidInput(format!("{} already exists", destination)));
    }
    Ok(())
}

/// Disk half of a relocation, run as one queued job
async fn relocateOnDisk(session: &Session, source: &str, destination: &str) -> Result<()> {
    let backend = session.backend.clone();
    let from = snippetFile(source);
    let to = snippetFile(destination);
    let folder = snippetFile(paths::parent(destination));

    session
        .queue
        .enqueue("relocate", move || async move {
            backend.createFolder(&folder)?;
            backend.rename(&from, &to)?;
            if backend.exists(&from) || !backend.exists(&to) {
                return Err(Error::Integrity(format!("Rename of {} to {} did not take effect", from, to)));
            }
            Ok(())
        })
        .await
}

// ============================================
// DELETION
// ============================================

async fn deleteSnippetInner(session: &SessionState, path: &str) -> Result<Option<String>> {
    let onDisk = session.backend.exists(&snippetFile(path));
    if !onDisk && !session.content.read().contains(path) {
        return Err(Error::NotFound(format!("Snippet {} not found", path)));
    }
    if !session.ui.confirm(&format!("Delete snippet '{}'?", paths::fileStem(path))) {
        return Ok(None);
    }

    if onDisk {
        let backend = session.backend.clone();
        let file = snippetFile(path);
        session
            .queue
            .enqueue("deleteSnippet", move || async move { backend.removeFile(&file) })
            .await?;
    }

    session.content.write().remove(path);
    tree::remove(&mut session.tree.write(), path);

    let orphaned = countCards(session, |p| paths::samePath(p, path));
    if orphaned > 0 {
        info!("[deleteSnippet] {} cards now reference a missing snippet", orphaned);
    }
    session.refreshCompiledPrompt(true);

    Ok(Some(if orphaned > 0 {
        format!("Snippet deleted ({} cards orphaned)", orphaned)
    } else {
        "Snippet deleted".to_string()
    }))
}

async fn deleteBoardInner(session: &SessionState, boardId: &str, path: &str) -> Result<Option<String>> {
    if boardId == DEFAULT_BOARD_ID {
        return Err(Error::InvalidInput("The default board cannot be deleted".to_string()));
    }
    let board = session.board(boardId);
    let file = resolveBoardFile(session, boardId, board.as_ref().and_then(|b| b.filePath.as_deref()), path);
    if board.is_none() && file.is_none() {
        return Err(Error::NotFound(format!("Board {} not found", boardId)));
    }
    let name = match (&board, &file) {
        (Some(b), _) => b.name.clone(),
        (None, Some(f)) => paths::fileStem(f).to_string(),
        (None, None) => boardId.to_string(),
    };
    if !session.ui.confirm(&format!("Delete board '{}'?", name)) {
        return Ok(None);
    }

    if let Some(file) = &file {
        if session.backend.exists(&snippetFile(file)) {
            let backend = session.backend.clone();
            let target = snippetFile(file);
            session
                .queue
                .enqueue("deleteBoardFile", move || async move { backend.removeFile(&target) })
                .await?;
        }
        tree::remove(&mut session.tree.write(), file);
    }

    session.boards.write().retain(|b| b.id != boardId);
    session.compiler.lock().invalidateBoard(boardId);
    switchIfActiveRemoved(session);

    session.saveEverything().await?;
    session.refreshCompiledPrompt(true);
    Ok(Some(format!("Board '{}' deleted", name)))
}

/// The file backing a board: its own `filePath` wins, a caller-supplied
/// path is only trusted when it holds this board
fn resolveBoardFile(session: &Session, boardId: &str, filePath: Option<&str>, path: &str) -> Option<String> {
    if let Some(own) = filePath {
        if !path.is_empty() && !paths::samePath(own, path) {
            debug!("[resolveBoardFile] Ignoring {} for board {} stored at {}", path, boardId, own);
        }
        return Some(paths::normalize(own));
    }
    if path.is_empty() {
        return None;
    }
    match tree::find(&session.tree.read(), path) {
        Some(TreeEntry::Board { content, .. }) if content.id == boardId => Some(path.to_string()),
        _ => None,
    }
}

async fn deleteFolderInner(session: &SessionState, path: &str) -> Result<Option<String>> {
    if path.is_empty() {
        return Err(Error::InvalidInput("The snippet root cannot be deleted".to_string()));
    }
    if !session.backend.exists(&snippetFile(path)) {
        return Err(Error::NotFound(format!("Folder {} not found", path)));
    }
    if !session.ui.confirm(&format!("Delete folder '{}' and everything in it?", paths::fileName(path))) {
        return Ok(None);
    }

    let backend = session.backend.clone();
    let folder = snippetFile(path);
    session
        .queue
        .enqueue("deleteFolder", move || async move { backend.deleteFolderRecursive(&folder) })
        .await?;

    let removedSnippets = session.content.write().removePrefix(path);

    let removedBoards: Vec<String> = {
        let mut boards = session.boards.write();
        let doomed: Vec<String> = boards
            .iter()
            .filter(|b| !b.isDefault())
            .filter(|b| b.filePath.as_deref().is_some_and(|p| paths::isWithin(p, path)))
            .map(|b| b.id.clone())
            .collect();
        boards.retain(|b| !doomed.contains(&b.id));
        // The default board survives; it just loses its file
        for board in boards.iter_mut() {
            if board.filePath.as_deref().is_some_and(|p| paths::isWithin(p, path)) {
                board.filePath = None;
            }
        }
        doomed
    };
    {
        let mut compiler = session.compiler.lock();
        for id in &removedBoards {
            compiler.invalidateBoard(id);
        }
    }

    tree::remove(&mut session.tree.write(), path);
    switchIfActiveRemoved(session);

    let orphaned = countCards(session, |p| paths::isWithin(p, path));
    info!(
        "[deleteFolder] Removed {} snippets, {} boards; {} cards orphaned",
        removedSnippets,
        removedBoards.len(),
        orphaned
    );

    session.saveEverything().await?;
    session.refreshCompiledPrompt(true);
    Ok(Some(format!(
        "Folder deleted ({} snippets, {} boards)",
        removedSnippets,
        removedBoards.len()
    )))
}

fn switchIfActiveRemoved(session: &Session) {
    let active = session.activeBoardId();
    if session.board(&active).is_none() {
        let fallback = session.boardIds().into_iter().next().unwrap_or_else(|| DEFAULT_BOARD_ID.to_string());
        debug!("[switchIfActiveRemoved] Active board {} gone, switching to {}", active, fallback);
        session.setActiveBoard(&fallback);
    }
}

// ============================================
// HELPERS
// ============================================

/// Apply `rewrite` to every card's `snippetPath` across all boards.
/// Returns the number of cards changed.
pub(crate) fn rewriteCardPaths(session: &Session, rewrite: impl Fn(&str) -> Option<String>) -> usize {
    let mut touchedBoards = Vec::new();
    let mut changed = 0;
    {
        let mut boards = session.boards.write();
        for board in boards.iter_mut() {
            let mut boardChanged = false;
            for card in board.cards.iter_mut() {
                if let Some(newPath) = rewrite(&card.snippetPath) {
                    if newPath != card.snippetPath {
                        card.snippetPath = newPath;
                        changed += 1;
                        boardChanged = true;
                    }
                }
            }
            if boardChanged {
                board.touch();
                touchedBoards.push(board.id.clone());
            }
        }
    }

    let mut compiler = session.compiler.lock();
    for id in &touchedBoards {
        compiler.invalidateBoard(id);
    }
    changed
}

pub(crate) fn countCards(session: &Session, matches: impl Fn(&str) -> bool) -> usize {
    session
        .boards
        .read()
        .iter()
        .flat_map(|b| b.cards.iter())
        .filter(|c| matches(&c.snippetPath))
        .count()
}

fn boardIdForFile(session: &Session, path: &str) -> Option<String> {
    let fromList = session
        .boards
        .read()
        .iter()
        .find(|b| b.filePath.as_deref().is_some_and(|p| paths::samePath(p, path)))
        .map(|b| b.id.clone());
    fromList.or_else(|| match tree::find(&session.tree.read(), path) {
        Some(TreeEntry::Board { content, .. }) => Some(content.id.clone()),
        _ => None,
    })
}

/// Destination for a file rename, keeping the original extension
fn renamedFile(source: &str, newName: &str) -> Result<String> {
    let name = validateName(newName)?;
    let fileName = match paths::extension(source) {
        Some(ext) if paths::extension(&name) != Some(ext) => format!("{}.{}", name, ext),
        _ => name,
    };
    Ok(paths::join(paths::parent(source), &fileName))
}

/// Step 7 never undoes the data change; failures are only logged
fn reloadTreeSoft(session: &Session, expanded: &BTreeSet<String>) {
    if let Err(e) = session.reloadTreeWith(expanded) {
        warn!("[reloadTreeSoft] Tree reload failed, keeping in-memory tree: {}", e);
    }
}

fn report(session: &Session, op: &str, outcome: Result<Relocation>, success: &str) -> Result<Relocation> {
    match &outcome {
        Ok(Relocation::Unchanged) => {
            debug!("[{}] Source and destination are the same", op);
            session.toast(ToastKind::Info, "Nothing to move");
        }
        Ok(Relocation::Moved { from, to, cardsUpdated }) => {
            info!("[{}] {} -> {} ({} cards updated)", op, from, to, cardsUpdated);
            session.finishMutation(success);
        }
        Err(e) => {
            error!("[{}] {}", op, e);
            session.toast(ToastKind::Error, &e.to_string());
        }
    }
    outcome
}

fn reportDelete(session: &Session, op: &str, outcome: Result<Option<String>>) -> Result<bool> {
    match outcome {
        Ok(Some(message)) => {
            info!("[{}] {}", op, message);
            session.finishMutation(&message);
            Ok(true)
        }
        Ok(None) => {
            debug!("[{}] Cancelled by user", op);
            Ok(false)
        }
        Err(e) => {
            error!("[{}] {}", op, e);
            session.toast(ToastKind::Error, &e.to_string());
            Err(e)
        }
    }
}
