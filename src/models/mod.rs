// Models module for promptboard
// Field names stay camelCase so the JSON files match the desktop app

pub mod board;
pub mod config;
pub mod snippet;
pub mod tree;

pub use board::{Board, BoardFile, Card, ImageRef, DEFAULT_BOARD_ID, MIN_CARD_HEIGHT, MIN_CARD_WIDTH};
pub use config::{AppState, EngineConfig, PerformanceFlags, Settings, SortConfig, SortDirection, SortField, UiState};
pub use snippet::Snippet;
pub use tree::{TreeEntry, CUT_SNIPPETS_FOLDER};

/// Current time as an RFC 3339 string
pub fn nowIso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
