// Allow non-snake_case names for JSON serialization compatibility with the board files
#![allow(non_snake_case)]

pub mod commands;
pub mod compiler;
pub mod content_cache;
pub mod error;
pub mod models;
pub mod paths;
pub mod persistence;
pub mod position;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tree;
pub mod tree_filter;
pub mod ui;

pub use compiler::PromptCompiler;
pub use content_cache::ContentCache;
pub use error::{Error, Result};
pub use persistence::{PersistenceQueue, QueueTicket};
pub use position::{CanvasRect, Geometry, PointerEvent, PositionEngine, Visual};
pub use scheduler::Debouncer;
pub use session::{Session, SessionState};
pub use storage::{Backend, FsBackend, MemBackend};
pub use sync::Relocation;
pub use ui::{LogUi, RecordingUi, ToastKind, UiHooks};

use tracing::Level;

/// Install the fmt subscriber. Unknown levels fall back to `info`.
/// Returns false when a subscriber was already installed.
pub fn initLogging(level: &str) -> bool {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
