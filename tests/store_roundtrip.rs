// Session load / save against a real store directory
#![allow(non_snake_case)]

use std::fs;
use std::sync::Arc;

use promptboard::commands::{board, card, snippet};
use promptboard::models::{EngineConfig, SortConfig, TreeEntry, DEFAULT_BOARD_ID};
use promptboard::storage::CONFIG_FILE;
use promptboard::tree_filter::filterTree;
use promptboard::{Backend, FsBackend, RecordingUi, Session, SessionState};
use tempfile::TempDir;

fn open(dir: &TempDir) -> SessionState {
    Session::open(Arc::new(FsBackend::new(dir.path())), Arc::new(RecordingUi::new())).unwrap()
}

#[tokio::test]
async fn config_frontmatter_drives_the_session() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        "---\nmaxTags: 2\ndefaultCardWidth: 400\n---\n\nnotes\n",
    )
    .unwrap();

    let session = open(&dir);
    assert_eq!(session.config.maxTags, 2);
    assert_eq!(session.config.compileCacheCapacity, 50);

    let tags: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
    assert!(snippet::createSnippet(&session, "", "Too many", "x", &tags).await.is_err());

    let path = snippet::createSnippet(&session, "", "Fine", "x", &tags[..2]).await.unwrap();
    let id = card::addCard(&session, DEFAULT_BOARD_ID, &path, 0.0, 0.0).unwrap();
    assert_eq!(session.board(DEFAULT_BOARD_ID).unwrap().card(&id).unwrap().width, 400.0);
}

#[tokio::test]
async fn engine_config_save_round_trips() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());
    let config = EngineConfig {
        autosaveDelayMs: 500,
        ..EngineConfig::default()
    };
    config.save(&backend).unwrap();

    let raw = backend.readFile(CONFIG_FILE).unwrap();
    assert!(raw.starts_with("---\n"));
    assert_eq!(EngineConfig::load(&backend), config);
}

#[tokio::test]
async fn boards_and_active_board_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let session = open(&dir);
    fs::create_dir_all(dir.path().join("snippets/Boards")).unwrap();

    let board_id = board::createBoard(&session, "Scenes", "Boards").await.unwrap();
    let path = snippet::createSnippet(&session, "", "Dawn", "early light", &[]).await.unwrap();
    card::addCard(&session, &board_id, &path, 10.0, 10.0).unwrap();
    session.saveEverything().await.unwrap();
    drop(session);

    assert!(dir.path().join("boards/app-state.json").is_file());
    let file = fs::read_to_string(dir.path().join("snippets/Boards/scenes.json")).unwrap();
    assert!(!file.contains("filePath"));

    let reopened = open(&dir);
    assert_eq!(reopened.activeBoardId(), board_id);
    let scenes = reopened.board(&board_id).unwrap();
    assert_eq!(scenes.filePath.as_deref(), Some("Boards/scenes.json"));
    assert_eq!(scenes.cards.len(), 1);
    assert_eq!(reopened.refreshCompiledPrompt(false), "early light");
}

#[tokio::test]
async fn search_keeps_ancestors_of_matches() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("snippets/Style/Light")).unwrap();
    fs::write(dir.path().join("snippets/Style/Light/dusk.txt"), "purple haze").unwrap();
    fs::write(dir.path().join("snippets/Style/noir.txt"), "hard shadows").unwrap();

    let session = open(&dir);
    let view = filterTree(&session.tree.read(), "haze", SortConfig::default());

    assert_eq!(view.len(), 1);
    match &view[0] {
        TreeEntry::Folder { name, children, expanded, .. } => {
            assert_eq!(name, "Style");
            assert!(*expanded);
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].children()[0].path(), "Style/Light/dusk.txt");
        }
        other => panic!("expected folder, got {:?}", other),
    }
}
