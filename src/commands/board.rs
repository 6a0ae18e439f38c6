// Board commands - create, switch and rename boards

use super::common::{finish, prefixedId, uniqueFileName, validateName};
use crate::error::{Error, Result};
use crate::models::{Board, TreeEntry};
use crate::paths;
use crate::session::SessionState;
use crate::storage::snippetFile;
use crate::tree;

/// Create a board stored as a file in `folderPath` and make it active.
/// Returns the board id.
pub async fn createBoard(session: &SessionState, name: &str, folderPath: &str) -> Result<String> {
    let outcome = createBoardInner(session, name, folderPath).await;
    finish(session, "createBoard", outcome, |_| format!("Board '{}' created", name.trim()))
}

async fn createBoardInner(session: &SessionState, name: &str, folderPath: &str) -> Result<String> {
    let name = validateName(name)?;
    let folder = paths::normalize(folderPath);
    if !folder.is_empty() && !session.backend.exists(&snippetFile(&folder)) {
        return Err(Error::NotFound(format!("Folder {} not found", folder)));
    }

    let mut board = Board::new(prefixedId("board"), name.clone());
    let path = paths::join(&folder, &uniqueFileName(&*session.backend, &folder, &name, "json"));
    board.filePath = Some(path.clone());
    let id = board.id.clone();

    session.boards.write().push(board.clone());
    session.setActiveBoard(&id);
    session.saveEverything().await?;

    let entry = TreeEntry::Board {
        name: paths::fileStem(&path).to_string(),
        path,
        content: board,
    };
    if !tree::insert(&mut session.tree.write(), &folder, entry) {
        session.reloadTree()?;
    }
    session.refreshCompiledPrompt(false);
    Ok(id)
}

pub fn switchBoard(session: &SessionState, boardId: &str) -> Result<()> {
    let outcome = if session.setActiveBoard(boardId) {
        session.refreshCompiledPrompt(false);
        session.triggerAutosave();
        Ok(())
    } else {
        Err(Error::NotFound(format!("Board {} not found", boardId)))
    };
    finish(session, "switchBoard", outcome, |_| {
        let name = session.board(boardId).map(|b| b.name).unwrap_or_default();
        format!("Switched to '{}'", name)
    })
}

/// Change a board's display name. Its file keeps its path; use
/// `renameBoardFile` to move the file itself.
pub fn renameBoard(session: &SessionState, boardId: &str, newName: &str) -> Result<()> {
    let outcome = validateName(newName).and_then(|name| {
        session
            .withBoardMut(boardId, |board| board.name = name.clone())
            .ok_or_else(|| Error::NotFound(format!("Board {} not found", boardId)))?;

        if let Some(board) = session.board(boardId) {
            if let Some(path) = &board.filePath {
                if let Some(TreeEntry::Board { content, .. }) = tree::findMut(&mut session.tree.write(), path) {
                    content.name = name.clone();
                }
            }
        }
        let _ = session.persistBoard(boardId);
        session.triggerAutosave();
        Ok(name)
    });
    finish(session, "renameBoard", outcome, |name| format!("Board renamed to '{}'", name)).map(|_| ())
}
