// Cleanup commands - orphaned card detection and repair
// Background repairs report a count only when they changed something

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::Board;
use crate::session::SessionState;
use crate::ui::ToastKind;

/// A card whose snippet path resolves to nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedCard {
    pub boardId: String,
    pub cardId: String,
    pub snippetPath: String,
}

pub fn findOrphanedCards(session: &SessionState) -> Vec<OrphanedCard> {
    let content = session.content.read();
    session
        .boards
        .read()
        .iter()
        .flat_map(|board| {
            board
                .cards
                .iter()
                .filter(|card| !content.contains(&card.snippetPath))
                .map(|card| OrphanedCard {
                    boardId: board.id.clone(),
                    cardId: card.id.clone(),
                    snippetPath: card.snippetPath.clone(),
                })
        })
        .collect()
}

/// Remove every orphaned card. Returns how many were removed.
pub fn cleanupOrphanedCards(session: &SessionState) -> usize {
    let orphans = findOrphanedCards(session);
    if orphans.is_empty() {
        debug!("[cleanupOrphanedCards] Nothing to clean");
        return 0;
    }

    let doomed: BTreeSet<(&str, &str)> = orphans
        .iter()
        .map(|o| (o.boardId.as_str(), o.cardId.as_str()))
        .collect();
    let touched = editBoards(session, |board| {
        let boardId = board.id.clone();
        let before = board.cards.len();
        board.cards.retain(|c| !doomed.contains(&(boardId.as_str(), c.id.as_str())));
        before - board.cards.len()
    });

    let removed = orphans.len();
    info!("[cleanupOrphanedCards] Removed {} cards across {} boards", removed, touched);
    afterRepair(session);
    session.toast(ToastKind::Info, &format!("Removed {} orphaned cards", removed));
    removed
}

/// Point orphaned cards at the one cache key their path ends with, e.g. a
/// legacy absolute path. Ambiguous matches are left alone.
pub fn repairCardReferences(session: &SessionState) -> usize {
    let mut repaired = 0;
    let touched = {
        let content = session.content.read();
        editBoards(session, |board| {
            let mut changed = 0;
            for card in board.cards.iter_mut() {
                if content.contains(&card.snippetPath) {
                    continue;
                }
                let matches = content.findBySuffix(&card.snippetPath);
                if let [only] = matches.as_slice() {
                    debug!("[repairCardReferences] {} -> {}", card.snippetPath, only);
                    card.snippetPath = only.to_string();
                    changed += 1;
                }
            }
            repaired += changed;
            changed
        })
    };

    if repaired == 0 {
        debug!("[repairCardReferences] Nothing to repair");
        return 0;
    }
    info!("[repairCardReferences] Repaired {} cards across {} boards", repaired, touched);
    afterRepair(session);
    session.toast(ToastKind::Info, &format!("Repaired {} card references", repaired));
    repaired
}

/// Apply `edit` to every board; boards where it reports changes are
/// touched and dropped from the compile cache. Returns the touched count.
fn editBoards(session: &SessionState, mut edit: impl FnMut(&mut Board) -> usize) -> usize {
    let mut touchedIds = Vec::new();
    for board in session.boards.write().iter_mut() {
        if edit(board) > 0 {
            board.touch();
            touchedIds.push(board.id.clone());
        }
    }
    let mut compiler = session.compiler.lock();
    for id in &touchedIds {
        compiler.invalidateBoard(id);
    }
    touchedIds.len()
}

fn afterRepair(session: &SessionState) {
    session.refreshCompiledPrompt(true);
    let _ = session.saveEverything();
    session.triggerAutosave();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, DEFAULT_BOARD_ID};
    use crate::session::Session;
    use crate::storage::{Backend, MemBackend};
    use crate::ui::RecordingUi;
    use std::sync::Arc;

    fn open(cards: Vec<Card>) -> (Arc<RecordingUi>, SessionState) {
        let backend = Arc::new(MemBackend::new());
        backend.writeFile("snippets/Prompts/a.json", r#"{"text":"a"}"#).unwrap();
        backend.writeFile("snippets/Prompts/b.json", r#"{"text":"b"}"#).unwrap();
        backend.writeFile("snippets/b.json", r#"{"text":"root b"}"#).unwrap();
        let ui = Arc::new(RecordingUi::new());
        let session = Session::open(backend, ui.clone()).unwrap();
        session.withBoardMut(DEFAULT_BOARD_ID, |board| board.cards = cards).unwrap();
        (ui, session)
    }

    fn card(id: &str, path: &str) -> Card {
        Card::new(id.into(), path.into(), 0.0, 0.0, 300.0, 200.0)
    }

    #[tokio::test]
    async fn test_find_and_cleanup_orphans() {
        let (ui, session) = open(vec![card("ok", "Prompts/a.json"), card("gone", "Prompts/deleted.json")]);

        let orphans = findOrphanedCards(&session);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].cardId, "gone");

        assert_eq!(cleanupOrphanedCards(&session), 1);
        assert_eq!(session.board(DEFAULT_BOARD_ID).unwrap().cards.len(), 1);
        assert_eq!(ui.toasts().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_is_silent_when_nothing_found() {
        let (ui, session) = open(vec![card("ok", "Prompts/a.json")]);
        assert_eq!(cleanupOrphanedCards(&session), 0);
        assert!(ui.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_repair_uses_unique_suffix_only() {
        let (ui, session) = open(vec![
            card("legacy", "C:\\Users\\me\\store\\snippets\\Prompts\\a.json"),
            card("ambiguous", "/old/Prompts/b.json"),
        ]);

        assert_eq!(repairCardReferences(&session), 1);
        let board = session.board(DEFAULT_BOARD_ID).unwrap();
        assert_eq!(board.card("legacy").unwrap().snippetPath, "Prompts/a.json");
        assert_eq!(board.card("ambiguous").unwrap().snippetPath, "/old/Prompts/b.json");
        assert_eq!(ui.toasts().len(), 1);
    }
}
