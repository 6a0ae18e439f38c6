// Reference sync against the real filesystem backend
#![allow(non_snake_case)]

use std::fs;
use std::sync::Arc;

use promptboard::commands::{board, card, cleanup, folder, snippet};
use promptboard::models::DEFAULT_BOARD_ID;
use promptboard::sync::{self, Relocation};
use promptboard::{Error, FsBackend, RecordingUi, Session, SessionState, ToastKind};
use tempfile::TempDir;

fn open(dir: &TempDir) -> (Arc<RecordingUi>, SessionState) {
    let ui = Arc::new(RecordingUi::new());
    let session = Session::open(Arc::new(FsBackend::new(dir.path())), ui.clone()).unwrap();
    (ui, session)
}

async fn seeded() -> (TempDir, Arc<RecordingUi>, SessionState) {
    let dir = TempDir::new().unwrap();
    let (ui, session) = open(&dir);
    folder::createFolder(&session, "", "a").await.unwrap();
    folder::createFolder(&session, "a", "b").await.unwrap();
    folder::createFolder(&session, "a/b", "c").await.unwrap();
    folder::createFolder(&session, "", "dest").await.unwrap();
    snippet::createSnippet(&session, "a/b", "x", "x text", &[]).await.unwrap();
    snippet::createSnippet(&session, "a/b/c", "y", "y text", &[]).await.unwrap();
    card::addCard(&session, DEFAULT_BOARD_ID, "a/b/x.json", 0.0, 0.0).unwrap();
    card::addCard(&session, DEFAULT_BOARD_ID, "a/b/c/y.json", 0.0, 100.0).unwrap();
    ui.takeToasts();
    (dir, ui, session)
}

fn cardPaths(session: &SessionState) -> Vec<String> {
    session
        .board(DEFAULT_BOARD_ID)
        .unwrap()
        .cards
        .iter()
        .map(|c| c.snippetPath.clone())
        .collect()
}

#[tokio::test]
async fn move_snippet_keeps_every_representation_in_step() {
    let (dir, ui, session) = seeded().await;

    let result = sync::moveSnippet(&session, "a/b/x.json", "dest").await.unwrap();
    assert!(matches!(result, Relocation::Moved { cardsUpdated: 1, .. }));

    assert!(dir.path().join("snippets/dest/x.json").is_file());
    assert!(!dir.path().join("snippets/a/b/x.json").exists());
    assert!(!cardPaths(&session).contains(&"a/b/x.json".to_string()));
    assert!(!session.content.read().contains("a/b/x.json"));
    assert_eq!(session.compiledPrompt(), "x text, y text");
    assert_eq!(ui.toasts().len(), 1);

    // Board files on disk carry the rewritten reference
    let saved = fs::read_to_string(dir.path().join("boards/boards.json")).unwrap();
    assert!(saved.contains("dest/x.json"));
}

#[tokio::test]
async fn folder_cycle_is_rejected_before_touching_disk() {
    let (dir, ui, session) = seeded().await;

    let err = sync::moveFolder(&session, "a/b", "a/b/c").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(dir.path().join("snippets/a/b/c/y.json").is_file());
    assert_eq!(ui.lastToast().unwrap().0, ToastKind::Error);
}

#[tokio::test]
async fn folder_move_rewrites_card_prefixes() {
    let (dir, _ui, session) = seeded().await;

    sync::moveFolder(&session, "a/b", "dest").await.unwrap();

    assert_eq!(cardPaths(&session), vec!["dest/b/x.json", "dest/b/c/y.json"]);
    assert!(dir.path().join("snippets/dest/b/c/y.json").is_file());
    assert!(cleanup::findOrphanedCards(&session).is_empty());
}

#[tokio::test]
async fn state_survives_reopen_after_moves() {
    let (dir, _ui, session) = seeded().await;
    sync::renameSnippet(&session, "a/b/x.json", "renamed").await.unwrap();
    drop(session);

    let (_ui, reopened) = open(&dir);
    assert_eq!(cardPaths(&reopened)[0], "a/b/renamed.json");
    assert_eq!(reopened.content.read().text("a/b/renamed.json"), Some("x text"));
}

#[tokio::test]
async fn deleting_a_snippet_orphans_cards_until_cleanup() {
    let (_dir, ui, session) = seeded().await;

    assert!(sync::deleteSnippet(&session, "a/b/x.json").await.unwrap());
    assert_eq!(cleanup::findOrphanedCards(&session).len(), 1);

    ui.takeToasts();
    assert_eq!(cleanup::cleanupOrphanedCards(&session), 1);
    assert_eq!(cardPaths(&session), vec!["a/b/c/y.json"]);
    assert_eq!(ui.toasts().len(), 1);
}

#[tokio::test]
async fn default_board_cannot_be_deleted() {
    let (_dir, _ui, session) = seeded().await;
    let before = session.boardIds();

    assert!(sync::deleteBoardFile(&session, DEFAULT_BOARD_ID, "").await.is_err());
    assert_eq!(session.boardIds(), before);
}

#[tokio::test]
async fn deleted_board_stays_deleted_after_reopen() {
    let (dir, _ui, session) = seeded().await;
    let id = board::createBoard(&session, "Doomed", "dest").await.unwrap();
    assert!(dir.path().join("snippets/dest/doomed.json").is_file());

    assert!(sync::deleteBoardFile(&session, &id, "").await.unwrap());
    assert!(!dir.path().join("snippets/dest/doomed.json").exists());
    drop(session);

    let (_ui, reopened) = open(&dir);
    assert!(reopened.board(&id).is_none());
}

#[tokio::test]
async fn renamed_folder_survives_reopen() {
    let (dir, _ui, session) = seeded().await;
    sync::renameFolder(&session, "a/b", "kept").await.unwrap();
    assert!(dir.path().join("snippets/a/kept/c/y.json").is_file());
    drop(session);

    let (_ui, reopened) = open(&dir);
    assert_eq!(cardPaths(&reopened), vec!["a/kept/x.json", "a/kept/c/y.json"]);
    assert!(cleanup::findOrphanedCards(&reopened).is_empty());
}
