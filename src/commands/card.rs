// Card commands - board-local card state
// Sentinel returns (Option / bool); the toast carries the error

use super::common::{boardChanged, finish, prefixedId};
use crate::error::{Error, Result};
use crate::models::Card;
use crate::paths;
use crate::session::SessionState;

/// Place a card for `snippetPath` at (x, y). Returns the card id.
pub fn addCard(session: &SessionState, boardId: &str, snippetPath: &str, x: f64, y: f64) -> Option<String> {
    let outcome = (|| {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return Err(Error::InvalidInput(format!("Invalid card position ({}, {})", x, y)));
        }
        let snippetPath = paths::normalize(snippetPath);
        if !session.content.read().contains(&snippetPath) {
            return Err(Error::NotFound(format!("Snippet {} not found", snippetPath)));
        }

        let card = Card::new(
            prefixedId("card"),
            snippetPath,
            x,
            y,
            session.config.defaultCardWidth,
            session.config.defaultCardHeight,
        );
        let id = card.id.clone();
        session
            .withBoardMut(boardId, |board| board.cards.push(card))
            .ok_or_else(|| missingBoard(boardId))?;
        boardChanged(session, boardId);
        Ok(id)
    })();
    finish(session, "addCard", outcome, |_| "Card added".to_string()).ok()
}

pub fn removeCard(session: &SessionState, boardId: &str, cardId: &str) -> bool {
    let outcome = session
        .withBoardMut(boardId, |board| {
            let before = board.cards.len();
            board.cards.retain(|c| c.id != cardId);
            board.cards.len() < before
        })
        .ok_or_else(|| missingBoard(boardId))
        .and_then(|removed| if removed { Ok(()) } else { Err(missingCard(cardId)) })
        .map(|_| boardChanged(session, boardId));
    finish(session, "removeCard", outcome, |_| "Card removed".to_string()).is_ok()
}

/// Returns the new lock state
pub fn toggleCardLock(session: &SessionState, boardId: &str, cardId: &str) -> Option<bool> {
    let outcome = updateCard(session, boardId, cardId, |card| {
        card.locked = !card.locked;
        card.locked
    });
    finish(session, "toggleCardLock", outcome, |locked| {
        let state = if *locked { "locked" } else { "unlocked" };
        format!("Card {}", state)
    })
    .ok()
}

/// Set or clear (`None` / empty) a card's color
pub fn setCardColor(session: &SessionState, boardId: &str, cardId: &str, color: Option<&str>) -> bool {
    let color = color.map(str::trim).unwrap_or_default().to_string();
    let outcome = updateCard(session, boardId, cardId, |card| card.color = color);
    finish(session, "setCardColor", outcome, |_| "Card color updated".to_string()).is_ok()
}

/// Override the card's text without touching the snippet. `None` or an
/// empty string restores the snippet text.
pub fn setCardCustomText(session: &SessionState, boardId: &str, cardId: &str, text: Option<&str>) -> bool {
    let text = text.filter(|t| !t.is_empty()).map(str::to_string);
    let outcome = updateCard(session, boardId, cardId, |card| card.customText = text);
    finish(session, "setCardCustomText", outcome, |_| "Card text updated".to_string()).is_ok()
}

/// Transfer a card to another board, keeping id, geometry and color
pub fn moveCardToBoard(session: &SessionState, fromBoardId: &str, cardId: &str, toBoardId: &str) -> bool {
    let outcome = (|| {
        if fromBoardId == toBoardId {
            return Err(Error::InvalidInput("Card is already on that board".to_string()));
        }
        if session.board(toBoardId).is_none() {
            return Err(missingBoard(toBoardId));
        }

        let card = session
            .withBoardMut(fromBoardId, |board| {
                let idx = board.cards.iter().position(|c| c.id == cardId)?;
                Some(board.cards.remove(idx))
            })
            .ok_or_else(|| missingBoard(fromBoardId))?
            .ok_or_else(|| missingCard(cardId))?;

        let target = session.board(toBoardId).map(|b| b.name).unwrap_or_default();
        let placed = session.withBoardMut(toBoardId, |board| board.cards.push(card.clone()));
        if placed.is_none() {
            // Target vanished in between; put the card back
            let _ = session.withBoardMut(fromBoardId, |board| board.cards.push(card));
            return Err(missingBoard(toBoardId));
        }

        boardChanged(session, fromBoardId);
        boardChanged(session, toBoardId);
        Ok(target)
    })();
    finish(session, "moveCardToBoard", outcome, |target| format!("Card moved to '{}'", target)).is_ok()
}

fn updateCard<R>(
    session: &SessionState,
    boardId: &str,
    cardId: &str,
    f: impl FnOnce(&mut Card) -> R,
) -> Result<R> {
    if session.board(boardId).is_none() {
        return Err(missingBoard(boardId));
    }
    let result = session.withCardMut(boardId, cardId, f).ok_or_else(|| missingCard(cardId))?;
    boardChanged(session, boardId);
    Ok(result)
}

fn missingBoard(boardId: &str) -> Error {
    Error::NotFound(format!("Board {} not found", boardId))
}

fn missingCard(cardId: &str) -> Error {
    Error::NotFound(format!("Card {} not found", cardId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Board, DEFAULT_BOARD_ID};
    use crate::session::Session;
    use crate::storage::{Backend, MemBackend};
    use crate::ui::{RecordingUi, ToastKind};
    use std::sync::Arc;

    fn open() -> (Arc<RecordingUi>, SessionState) {
        let backend = Arc::new(MemBackend::new());
        backend.writeFile("snippets/p.json", r#"{"text":"hello"}"#).unwrap();
        let ui = Arc::new(RecordingUi::new());
        let session = Session::open(backend, ui.clone()).unwrap();
        session.boards.write().push(Board::new("b2".into(), "Other".into()));
        (ui, session)
    }

    #[tokio::test]
    async fn test_add_card_uses_default_size_and_toasts_once() {
        let (ui, session) = open();
        let id = addCard(&session, DEFAULT_BOARD_ID, "p.json", 40.0, 60.0).unwrap();
        let board = session.board(DEFAULT_BOARD_ID).unwrap();
        let card = board.card(&id).unwrap();
        assert_eq!((card.width, card.height), (300.0, 200.0));
        assert_eq!(session.compiledPrompt(), "hello");
        assert_eq!(ui.toasts().len(), 1);
    }

    #[tokio::test]
    async fn test_add_card_rejects_bad_input() {
        let (ui, session) = open();
        assert!(addCard(&session, DEFAULT_BOARD_ID, "p.json", f64::NAN, 0.0).is_none());
        assert!(addCard(&session, DEFAULT_BOARD_ID, "missing.json", 0.0, 0.0).is_none());
        assert!(addCard(&session, "nope", "p.json", 0.0, 0.0).is_none());
        assert!(session.board(DEFAULT_BOARD_ID).unwrap().cards.is_empty());
        assert!(ui.toasts().iter().all(|(kind, _)| *kind == ToastKind::Error));
    }

    #[tokio::test]
    async fn test_card_state_commands() {
        let (_ui, session) = open();
        let id = addCard(&session, DEFAULT_BOARD_ID, "p.json", 0.0, 0.0).unwrap();

        assert_eq!(toggleCardLock(&session, DEFAULT_BOARD_ID, &id), Some(true));
        assert!(setCardColor(&session, DEFAULT_BOARD_ID, &id, Some("#ff0000")));
        assert!(setCardCustomText(&session, DEFAULT_BOARD_ID, &id, Some("override")));
        {
            let board = session.board(DEFAULT_BOARD_ID).unwrap();
            let card = board.card(&id).unwrap();
            assert!(card.locked);
            assert_eq!(card.color, "#ff0000");
            assert_eq!(card.customText.as_deref(), Some("override"));
        }
        assert_eq!(session.compiledPrompt(), "override");

        assert!(setCardCustomText(&session, DEFAULT_BOARD_ID, &id, Some("")));
        assert_eq!(session.board(DEFAULT_BOARD_ID).unwrap().card(&id).unwrap().customText, None);
        assert!(!setCardColor(&session, DEFAULT_BOARD_ID, "ghost", None));
    }

    #[tokio::test]
    async fn test_remove_card() {
        let (_ui, session) = open();
        let id = addCard(&session, DEFAULT_BOARD_ID, "p.json", 0.0, 0.0).unwrap();
        assert!(removeCard(&session, DEFAULT_BOARD_ID, &id));
        assert!(!removeCard(&session, DEFAULT_BOARD_ID, &id));
    }

    #[tokio::test]
    async fn test_move_card_to_board_keeps_identity() {
        let (_ui, session) = open();
        let id = addCard(&session, DEFAULT_BOARD_ID, "p.json", 15.0, 25.0).unwrap();
        setCardColor(&session, DEFAULT_BOARD_ID, &id, Some("blue"));

        assert!(moveCardToBoard(&session, DEFAULT_BOARD_ID, &id, "b2"));
        assert!(session.board(DEFAULT_BOARD_ID).unwrap().card(&id).is_none());
        let moved = session.board("b2").unwrap().card(&id).cloned().unwrap();
        assert_eq!((moved.x, moved.y, moved.color.as_str()), (15.0, 25.0, "blue"));

        assert!(!moveCardToBoard(&session, "b2", &id, "b2"));
        assert!(!moveCardToBoard(&session, "b2", &id, "missing"));
        assert!(session.board("b2").unwrap().card(&id).is_some());
    }
}
