// UI hooks - the presentation surface the engine calls but does not own

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Warning,
    Error,
}

pub trait UiHooks: Send + Sync {
    /// Toast / notification sink
    fn toast(&self, kind: ToastKind, message: &str);

    /// Confirmation prompt for destructive actions
    fn confirm(&self, _message: &str) -> bool {
        true
    }

    fn renderBoard(&self) -> Result<(), String> {
        Ok(())
    }

    fn renderSidebar(&self) -> Result<(), String> {
        Ok(())
    }

    /// Drag visual for a card that starts moving
    fn dragImage(&self, _cardId: &str) {}
}

/// Headless hooks: toasts go to the log, confirmations are accepted
pub struct LogUi;

impl UiHooks for LogUi {
    fn toast(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Success | ToastKind::Info => info!("[toast] {}", message),
            ToastKind::Warning => warn!("[toast] {}", message),
            ToastKind::Error => error!("[toast] {}", message),
        }
    }
}

/// Hooks that remember what they were asked to show
pub struct RecordingUi {
    toasts: Mutex<Vec<(ToastKind, String)>>,
    confirmAnswer: AtomicBool,
    failRender: AtomicBool,
    renders: Mutex<usize>,
}

impl Default for RecordingUi {
    fn default() -> Self {
        Self {
            toasts: Mutex::new(Vec::new()),
            confirmAnswer: AtomicBool::new(true),
            failRender: AtomicBool::new(false),
            renders: Mutex::new(0),
        }
    }
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setConfirmAnswer(&self, answer: bool) {
        self.confirmAnswer.store(answer, Ordering::SeqCst);
    }

    pub fn setFailRender(&self, fail: bool) {
        self.failRender.store(fail, Ordering::SeqCst);
    }

    pub fn toasts(&self) -> Vec<(ToastKind, String)> {
        self.toasts.lock().clone()
    }

    pub fn takeToasts(&self) -> Vec<(ToastKind, String)> {
        std::mem::take(&mut *self.toasts.lock())
    }

    pub fn lastToast(&self) -> Option<(ToastKind, String)> {
        self.toasts.lock().last().cloned()
    }

    pub fn renderCount(&self) -> usize {
        *self.renders.lock()
    }

    fn render(&self) -> Result<(), String> {
        *self.renders.lock() += 1;
        if self.failRender.load(Ordering::SeqCst) {
            Err("render failed".to_string())
        } else {
            Ok(())
        }
    }
}

impl UiHooks for RecordingUi {
    fn toast(&self, kind: ToastKind, message: &str) {
        self.toasts.lock().push((kind, message.to_string()));
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirmAnswer.load(Ordering::SeqCst)
    }

    fn renderBoard(&self) -> Result<(), String> {
        self.render()
    }

    fn renderSidebar(&self) -> Result<(), String> {
        self.render()
    }
}
