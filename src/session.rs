// Session - explicit context object shared by every engine component
// Replaces module-level caches with fields guarded by parking_lot locks

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::compiler::PromptCompiler;
use crate::content_cache::ContentCache;
use crate::error::Result;
use crate::models::{
    nowIso, AppState, Board, Card, EngineConfig, PerformanceFlags, Settings, TreeEntry, UiState, DEFAULT_BOARD_ID,
};
use crate::persistence::{PersistenceQueue, QueueTicket};
use crate::scheduler::Debouncer;
use crate::storage::{snippetFile, Backend, APP_STATE_FILE, BOARDS_FILE};
use crate::tree;
use crate::ui::{ToastKind, UiHooks};

pub struct Session {
    pub backend: Arc<dyn Backend>,
    pub config: EngineConfig,
    pub content: RwLock<ContentCache>,
    pub tree: RwLock<Vec<TreeEntry>>,
    pub boards: RwLock<Vec<Board>>,
    pub activeBoardId: RwLock<String>,
    pub settings: RwLock<Settings>,
    pub uiState: RwLock<UiState>,
    pub tutorial: RwLock<Value>,
    pub performance: RwLock<PerformanceFlags>,
    pub compiler: Mutex<PromptCompiler>,
    pub compiledPrompt: RwLock<String>,
    pub queue: PersistenceQueue,
    pub ui: Arc<dyn UiHooks>,
    autosave: Debouncer,
    autosaveRuns: AtomicUsize,
}

pub type SessionState = Arc<Session>;

impl Session {
    /// Load everything from the backing store. Must run inside a tokio
    /// runtime (the persistence worker is spawned here).
    pub fn open(backend: Arc<dyn Backend>, ui: Arc<dyn UiHooks>) -> Result<SessionState> {
        info!("[Session::open] Opening store");

        let config = EngineConfig::load(&*backend);
        let appState = loadAppState(&*backend);

        let mut entries = tree::loadTree(&*backend)?;
        let expanded: BTreeSet<String> = appState.uiState.expandedFolders.iter().cloned().collect();
        tree::applyExpanded(&mut entries, &expanded);

        let mut content = ContentCache::new();
        for (path, snippet) in tree::snippetEntries(&entries) {
            content.insert(&path, snippet);
        }

        let mut boards = appState.boards;
        mergeBoardFiles(&mut boards, &entries);
        ensureDefaultBoard(&mut boards);

        let activeBoardId = appState
            .uiState
            .activeBoardId
            .clone()
            .filter(|id| boards.iter().any(|b| &b.id == id))
            .unwrap_or_else(|| DEFAULT_BOARD_ID.to_string());

        info!(
            "[Session::open] Loaded {} boards, {} snippets, active board {}",
            boards.len(),
            content.len(),
            activeBoardId
        );

        let autosaveDelay = Duration::from_millis(config.autosaveDelayMs);
        let compiler = PromptCompiler::new(config.compileCacheCapacity);

        Ok(Arc::new(Self {
            backend,
            config,
            content: RwLock::new(content),
            tree: RwLock::new(entries),
            boards: RwLock::new(boards),
            activeBoardId: RwLock::new(activeBoardId),
            settings: RwLock::new(appState.settings),
            uiState: RwLock::new(appState.uiState),
            tutorial: RwLock::new(appState.tutorial),
            performance: RwLock::new(appState.performance),
            compiler: Mutex::new(compiler),
            compiledPrompt: RwLock::new(String::new()),
            queue: PersistenceQueue::new(),
            ui,
            autosave: Debouncer::new("autosave", autosaveDelay),
            autosaveRuns: AtomicUsize::new(0),
        }))
    }

    // ============================================
    // BOARDS
    // ============================================

    pub fn activeBoardId(&self) -> String {
        self.activeBoardId.read().clone()
    }

    pub fn board(&self, boardId: &str) -> Option<Board> {
        self.boards.read().iter().find(|b| b.id == boardId).cloned()
    }

    pub fn activeBoard(&self) -> Option<Board> {
        let id = self.activeBoardId();
        self.board(&id)
    }

    pub fn boardIds(&self) -> Vec<String> {
        self.boards.read().iter().map(|b| b.id.clone()).collect()
    }

    /// Make `boardId` the active board. False when it does not exist.
    pub fn setActiveBoard(&self, boardId: &str) -> bool {
        if !self.boards.read().iter().any(|b| b.id == boardId) {
            return false;
        }
        *self.activeBoardId.write() = boardId.to_string();
        self.uiState.write().activeBoardId = Some(boardId.to_string());
        true
    }

    /// Mutate a board in place and bump its `modifiedAt`
    pub fn withBoardMut<R>(&self, boardId: &str, f: impl FnOnce(&mut Board) -> R) -> Option<R> {
        let mut boards = self.boards.write();
        let board = boards.iter_mut().find(|b| b.id == boardId)?;
        let result = f(board);
        board.touch();
        Some(result)
    }

    pub fn withCardMut<R>(&self, boardId: &str, cardId: &str, f: impl FnOnce(&mut Card) -> R) -> Option<R> {
        let mut boards = self.boards.write();
        let board = boards.iter_mut().find(|b| b.id == boardId)?;
        let card = board.cardMut(cardId)?;
        let result = f(card);
        board.touch();
        Some(result)
    }

    pub fn cardExists(&self, boardId: &str, cardId: &str) -> bool {
        self.boards
            .read()
            .iter()
            .find(|b| b.id == boardId)
            .is_some_and(|b| b.card(cardId).is_some())
    }

    // ============================================
    // COMPILED PROMPT
    // ============================================

    pub fn colorMode(&self) -> bool {
        self.settings.read().colorMode
    }

    /// Recompile the active board's prompt and remember it
    pub fn refreshCompiledPrompt(&self, force: bool) -> String {
        let Some(board) = self.activeBoard() else {
            debug!("[refreshCompiledPrompt] No active board");
            return String::new();
        };
        let colorMode = self.colorMode();

        let compiled = {
            let content = self.content.read();
            self.compiler.lock().getOrCompile(&board, &content, colorMode, force)
        };
        *self.compiledPrompt.write() = compiled.clone();
        compiled
    }

    pub fn compiledPrompt(&self) -> String {
        self.compiledPrompt.read().clone()
    }

    // ============================================
    // PERSISTENCE
    // ============================================

    /// Queue a write of one board's own file. None when the board is
    /// unknown or only lives in the aggregate files.
    pub fn persistBoard(&self, boardId: &str) -> Option<QueueTicket<()>> {
        let board = self.board(boardId)?;
        let filePath = board.filePath.clone()?;
        let backend = self.backend.clone();

        Some(self.queue.enqueue("persistBoard", move || async move {
            let json = board.toFileJson()?;
            backend.writeFile(&snippetFile(&filePath), &json)
        }))
    }

    /// Queue the full save: board list, app-state envelope and every board
    /// file, all from one snapshot taken when the job runs.
    pub fn saveEverything(self: &Arc<Self>) -> QueueTicket<()> {
        let session = Arc::downgrade(self);
        self.queue.enqueue("saveEverything", move || async move {
            match session.upgrade() {
                Some(session) => session.writeEverything(),
                None => Ok(()),
            }
        })
    }

    fn writeEverything(&self) -> Result<()> {
        let state = self.appStateSnapshot();

        self.backend.writeFile(APP_STATE_FILE, &serde_json::to_string_pretty(&state)?)?;
        self.writeBoards(&state.boards)?;
        debug!("[saveEverything] Wrote {} boards", state.boards.len());
        Ok(())
    }

    fn writeBoards(&self, boards: &[Board]) -> Result<()> {
        self.backend.writeFile(BOARDS_FILE, &serde_json::to_string_pretty(boards)?)?;
        for board in boards {
            if let Some(filePath) = &board.filePath {
                self.backend.writeFile(&snippetFile(filePath), &board.toFileJson()?)?;
            }
        }
        Ok(())
    }

    pub fn appStateSnapshot(&self) -> AppState {
        let mut uiState = self.uiState.read().clone();
        uiState.activeBoardId = Some(self.activeBoardId());
        uiState.expandedFolders = tree::collectExpanded(&self.tree.read()).into_iter().collect();

        AppState {
            version: crate::models::config::APP_STATE_VERSION,
            timestamp: nowIso(),
            boards: self.boards.read().clone(),
            settings: self.settings.read().clone(),
            uiState,
            tutorial: self.tutorial.read().clone(),
            performance: self.performance.read().clone(),
        }
    }

    /// Debounced save: only the last trigger inside the window enqueues
    pub fn triggerAutosave(self: &Arc<Self>) {
        let session = Arc::downgrade(self);
        self.autosave.trigger(move || {
            if let Some(session) = session.upgrade() {
                session.autosaveRuns.fetch_add(1, Ordering::SeqCst);
                let _ = session.saveEverything();
            }
        });
    }

    /// Run a pending autosave right away
    pub fn flushAutosave(&self) -> bool {
        self.autosave.flush()
    }

    pub fn autosavePending(&self) -> bool {
        self.autosave.isPending()
    }

    /// Number of autosaves that actually enqueued a save
    pub fn autosaveRuns(&self) -> usize {
        self.autosaveRuns.load(Ordering::SeqCst)
    }

    // ============================================
    // TREE
    // ============================================

    /// Rebuild the tree from disk keeping the current expanded folders
    pub fn reloadTree(&self) -> Result<()> {
        let expanded = tree::collectExpanded(&self.tree.read());
        self.reloadTreeWith(&expanded)
    }

    /// Rebuild the tree from disk and apply `expanded` on top. The cache
    /// follows disk: new snippets are added, keys without a file dropped.
    /// Cached values for snippets still on disk are kept.
    pub fn reloadTreeWith(&self, expanded: &BTreeSet<String>) -> Result<()> {
        let mut entries = tree::loadTree(&*self.backend)?;
        tree::applyExpanded(&mut entries, expanded);

        let (added, dropped) = {
            let mut content = self.content.write();
            let mut added = 0;
            let mut onDisk = HashSet::new();
            for (path, snippet) in tree::snippetEntries(&entries) {
                if !content.contains(&path) {
                    content.insert(&path, snippet);
                    added += 1;
                }
                onDisk.insert(path);
            }
            (added, content.retainPaths(&onDisk))
        };
        if added > 0 || dropped > 0 {
            info!("[reloadTree] Cache synced with disk: {} added, {} dropped", added, dropped);
        }
        if dropped > 0 {
            self.compiler.lock().clear();
        }

        *self.tree.write() = entries;
        self.uiState.write().expandedFolders = expanded.iter().cloned().collect();
        Ok(())
    }

    // ============================================
    // UI
    // ============================================

    pub fn toast(&self, kind: ToastKind, message: &str) {
        self.ui.toast(kind, message);
    }

    /// Re-render sidebar and board. Errors are returned, never raised.
    pub fn refreshViews(&self) -> std::result::Result<(), String> {
        self.ui.renderSidebar()?;
        self.ui.renderBoard()
    }

    /// Finish a successful mutation: refresh, then exactly one toast. A
    /// failed refresh replaces the success toast with a warning.
    pub fn finishMutation(&self, success: &str) {
        match self.refreshViews() {
            Ok(()) => self.toast(ToastKind::Success, success),
            Err(e) => {
                warn!("[finishMutation] View refresh failed: {}", e);
                self.toast(ToastKind::Warning, &format!("{} (view refresh failed: {})", success, e));
            }
        }
    }
}

// ============================================
// LOADING HELPERS
// ============================================

fn loadAppState(backend: &dyn Backend) -> AppState {
    let empty = || AppState {
        version: crate::models::config::APP_STATE_VERSION,
        timestamp: String::new(),
        boards: Vec::new(),
        settings: Settings::default(),
        uiState: UiState::default(),
        tutorial: Value::Null,
        performance: PerformanceFlags::default(),
    };

    if backend.exists(APP_STATE_FILE) {
        match backend
            .readFile(APP_STATE_FILE)
            .and_then(|raw| Ok(serde_json::from_str::<AppState>(&raw)?))
        {
            Ok(state) => return state,
            Err(e) => warn!("[loadAppState] Unreadable {}: {}", APP_STATE_FILE, e),
        }
    }

    if backend.exists(BOARDS_FILE) {
        match backend
            .readFile(BOARDS_FILE)
            .and_then(|raw| Ok(serde_json::from_str::<Vec<Board>>(&raw)?))
        {
            Ok(boards) => {
                info!("[loadAppState] Falling back to {}", BOARDS_FILE);
                return AppState { boards, ..empty() };
            }
            Err(e) => warn!("[loadAppState] Unreadable {}: {}", BOARDS_FILE, e),
        }
    }

    empty()
}

/// Fold board files found in the tree into the board list. Same id: the
/// newer `modifiedAt` wins and `filePath` follows the tree.
fn mergeBoardFiles(boards: &mut Vec<Board>, entries: &[TreeEntry]) {
    for (path, fileBoard) in tree::boardEntries(entries) {
        match boards.iter_mut().find(|b| b.id == fileBoard.id) {
            Some(existing) => {
                if fileBoard.modifiedAt > existing.modifiedAt {
                    *existing = fileBoard;
                }
                existing.filePath = Some(path);
            }
            None => boards.push(fileBoard),
        }
    }
}

fn ensureDefaultBoard(boards: &mut Vec<Board>) {
    if !boards.iter().any(|b| b.isDefault()) {
        debug!("[ensureDefaultBoard] Creating default board");
        boards.insert(0, Board::defaultBoard());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemBackend;
    use crate::ui::RecordingUi;

    fn open(backend: Arc<MemBackend>) -> SessionState {
        Session::open(backend, Arc::new(RecordingUi::new())).unwrap()
    }

    #[tokio::test]
    async fn test_open_empty_store_has_default_board() {
        let session = open(Arc::new(MemBackend::new()));
        assert_eq!(session.boardIds(), vec![DEFAULT_BOARD_ID.to_string()]);
        assert_eq!(session.activeBoardId(), DEFAULT_BOARD_ID);
    }

    #[tokio::test]
    async fn test_open_merges_board_files_and_legacy_list() {
        let backend = Arc::new(MemBackend::new());
        backend
            .writeFile(BOARDS_FILE, r#"[{"id":"b1","name":"Old","modifiedAt":"2020-01-01"}]"#)
            .unwrap();
        backend
            .writeFile(
                "snippets/Boards/b1.json",
                r#"{"id":"b1","name":"From file","cards":[],"modifiedAt":"2024-01-01"}"#,
            )
            .unwrap();
        backend
            .writeFile("snippets/x.json", r#"{"text":"hello"}"#)
            .unwrap();

        let session = open(backend);
        let board = session.board("b1").unwrap();
        assert_eq!(board.name, "From file");
        assert_eq!(board.filePath.as_deref(), Some("Boards/b1.json"));
        assert_eq!(session.content.read().text("x.json"), Some("hello"));
        assert!(session.board(DEFAULT_BOARD_ID).is_some());
    }

    #[tokio::test]
    async fn test_open_loads_snippet_with_foreign_version() {
        let backend = Arc::new(MemBackend::new());
        backend
            .writeFile("snippets/s.json", r#"{"id":"x","text":"hello","tags":[],"version":"1.0"}"#)
            .unwrap();
        let session = open(backend);
        assert_eq!(session.content.read().text("s.json"), Some("hello"));
    }

    #[tokio::test]
    async fn test_reload_drops_snippets_gone_from_disk() {
        let backend = Arc::new(MemBackend::new());
        backend.writeFile("snippets/a/x.json", r#"{"text":"x"}"#).unwrap();
        backend.writeFile("snippets/keep.json", r#"{"text":"keep"}"#).unwrap();
        let session = open(backend.clone());
        session
            .withBoardMut(DEFAULT_BOARD_ID, |board| {
                board.cards.push(Card::new("c1".into(), "a/x.json".into(), 0.0, 0.0, 300.0, 200.0));
            })
            .unwrap();

        // Removed behind the session's back
        backend.deleteFolderRecursive("snippets/a").unwrap();
        backend.writeFile("snippets/new.json", r#"{"text":"new"}"#).unwrap();
        session.reloadTree().unwrap();

        let content = session.content.read();
        assert!(!content.contains("a/x.json"));
        assert_eq!(content.text("keep.json"), Some("keep"));
        assert_eq!(content.text("new.json"), Some("new"));
        drop(content);

        let orphans = crate::commands::cleanup::findOrphanedCards(&session);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].snippetPath, "a/x.json");
    }

    #[tokio::test]
    async fn test_save_everything_writes_three_targets() {
        let backend = Arc::new(MemBackend::new());
        let session = open(backend.clone());
        session
            .withBoardMut(DEFAULT_BOARD_ID, |b| b.filePath = Some("Boards/default.json".into()))
            .unwrap();

        session.saveEverything().await.unwrap();

        let state: AppState = serde_json::from_str(&backend.readFile(APP_STATE_FILE).unwrap()).unwrap();
        assert_eq!(state.boards.len(), 1);
        assert_eq!(state.uiState.activeBoardId.as_deref(), Some(DEFAULT_BOARD_ID));
        assert!(backend.exists(BOARDS_FILE));
        let file = backend.readFile("snippets/Boards/default.json").unwrap();
        assert!(!file.contains("filePath"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_coalesces_triggers() {
        let session = open(Arc::new(MemBackend::new()));
        let before = session.queue.enqueuedCount();

        for _ in 0..10 {
            session.triggerAutosave();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(session.queue.enqueuedCount(), before);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        session.queue.drain().await.unwrap();
        assert_eq!(session.queue.enqueuedCount(), before + 1);
        assert_eq!(session.autosaveRuns(), 1);
    }

    #[tokio::test]
    async fn test_active_board_persisted_through_reopen() {
        let backend = Arc::new(MemBackend::new());
        let session = open(backend.clone());
        {
            let mut boards = session.boards.write();
            boards.push(Board::new("b2".into(), "Second".into()));
        }
        assert!(session.setActiveBoard("b2"));
        assert!(!session.setActiveBoard("missing"));
        session.saveEverything().await.unwrap();

        let reopened = open(backend);
        assert_eq!(reopened.activeBoardId(), "b2");
    }
}
