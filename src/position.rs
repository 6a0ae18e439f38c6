// Position engine - pointer-driven drag and resize of cards
// One interaction at a time; the model is written at most once per frame

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MIN_CARD_HEIGHT, MIN_CARD_WIDTH};
use crate::session::SessionState;

/// Pointer event as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub clientX: f64,
    pub clientY: f64,
    /// Milliseconds, monotonic
    pub timeStamp: f64,
}

impl PointerEvent {
    pub fn new(clientX: f64, clientY: f64, timeStamp: f64) -> Self {
        Self { clientX, clientY, timeStamp }
    }
}

/// Canvas bounding box, measured once when an interaction starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Cheap visual update the host applies on every pointer move
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visual {
    Translate { dx: f64, dy: f64 },
    Size { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Drag,
    Resize,
}

struct Interaction {
    boardId: String,
    cardId: String,
    mode: Mode,
    startX: f64,
    startY: f64,
    original: Geometry,
    canvas: CanvasRect,
    pending: Option<Geometry>,
    lastCompileAt: Option<f64>,
    /// Set by a pointer move, consumed by the next frame commit
    compileDue: bool,
}

impl Interaction {
    /// Geometry for the pointer at `event`: clamped to the canvas when
    /// dragging, floored at the minimum size when resizing
    fn proposed(&self, event: &PointerEvent) -> Geometry {
        let dx = event.clientX - self.startX;
        let dy = event.clientY - self.startY;
        let o = self.original;

        match self.mode {
            Mode::Drag => {
                let maxX = (self.canvas.width - o.width).max(0.0);
                let maxY = (self.canvas.height - o.height).max(0.0);
                Geometry {
                    x: (o.x + dx).clamp(0.0, maxX),
                    y: (o.y + dy).clamp(0.0, maxY),
                    ..o
                }
            }
            Mode::Resize => Geometry {
                width: (o.width + dx).max(MIN_CARD_WIDTH),
                height: (o.height + dy).max(MIN_CARD_HEIGHT),
                ..o
            },
        }
    }

    fn visual(&self, g: &Geometry) -> Visual {
        match self.mode {
            Mode::Drag => Visual::Translate {
                dx: g.x - self.original.x,
                dy: g.y - self.original.y,
            },
            Mode::Resize => Visual::Size {
                width: g.width,
                height: g.height,
            },
        }
    }
}

pub struct PositionEngine {
    session: SessionState,
    active: Mutex<Option<Interaction>>,
    compileRuns: AtomicUsize,
}

impl PositionEngine {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            active: Mutex::new(None),
            compileRuns: AtomicUsize::new(0),
        }
    }

    pub fn beginDrag(&self, event: PointerEvent, cardId: &str, canvas: CanvasRect) -> bool {
        self.begin(Mode::Drag, event, cardId, canvas)
    }

    pub fn beginResize(&self, event: PointerEvent, cardId: &str, canvas: CanvasRect) -> bool {
        self.begin(Mode::Resize, event, cardId, canvas)
    }

    fn begin(&self, mode: Mode, event: PointerEvent, cardId: &str, canvas: CanvasRect) -> bool {
        let boardId = self.session.activeBoardId();
        let Some(card) = self.session.board(&boardId).and_then(|b| b.card(cardId).cloned()) else {
            debug!("[PositionEngine::begin] Card {} not on board {}", cardId, boardId);
            return false;
        };
        if card.locked {
            debug!("[PositionEngine::begin] Card {} is locked", cardId);
            return false;
        }

        let interaction = Interaction {
            boardId,
            cardId: cardId.to_string(),
            mode,
            startX: event.clientX,
            startY: event.clientY,
            original: Geometry {
                x: card.x,
                y: card.y,
                width: card.width,
                height: card.height,
            },
            canvas,
            pending: None,
            lastCompileAt: None,
            compileDue: false,
        };
        if self.active.lock().replace(interaction).is_some() {
            debug!("[PositionEngine::begin] Replacing unfinished interaction");
        }
        if mode == Mode::Drag {
            self.session.ui.dragImage(cardId);
        }
        true
    }

    pub fn isActive(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Pointer moved. Returns the visual to apply, or None when no
    /// interaction is running (or its card vanished). A throttled compile
    /// is scheduled for the next frame, after the geometry is committed.
    pub fn onPointerMove(&self, event: PointerEvent) -> Option<Visual> {
        let mut guard = self.active.lock();
        let interaction = guard.as_mut()?;
        if !self.session.cardExists(&interaction.boardId, &interaction.cardId) {
            debug!("[PositionEngine::onPointerMove] Card {} vanished", interaction.cardId);
            *guard = None;
            return None;
        }

        let proposed = interaction.proposed(&event);
        interaction.pending = Some(proposed);

        let throttle = self.session.config.compileThrottleMs;
        if interaction.lastCompileAt.is_none_or(|last| event.timeStamp - last >= throttle) {
            interaction.lastCompileAt = Some(event.timeStamp);
            interaction.compileDue = true;
        }
        Some(interaction.visual(&proposed))
    }

    /// Frame tick: write the pending geometry into the model, then run the
    /// compile a pointer move scheduled
    pub fn onAnimationFrame(&self) -> bool {
        let compileDue = {
            let mut guard = self.active.lock();
            let Some(interaction) = guard.as_mut() else {
                return false;
            };
            let Some(pending) = interaction.pending.take() else {
                return false;
            };
            if !self.writeGeometry(&interaction.boardId, &interaction.cardId, pending) {
                debug!("[PositionEngine::onAnimationFrame] Card {} vanished", interaction.cardId);
                *guard = None;
                return false;
            }
            std::mem::take(&mut interaction.compileDue)
        };

        if compileDue {
            self.compile();
        }
        true
    }

    /// End of the sequence: commit (even without movement), recompile,
    /// persist and toast. Returns the committed geometry.
    pub fn onPointerUp(&self, event: PointerEvent) -> Option<Geometry> {
        let interaction = self.active.lock().take()?;
        let finalGeometry = interaction.proposed(&event);

        if !self.writeGeometry(&interaction.boardId, &interaction.cardId, finalGeometry) {
            debug!("[PositionEngine::onPointerUp] Card {} vanished", interaction.cardId);
            return None;
        }

        self.session.refreshCompiledPrompt(true);
        self.compileRuns.fetch_add(1, Ordering::SeqCst);
        let _ = self.session.persistBoard(&interaction.boardId);
        self.session.triggerAutosave();

        let message = match interaction.mode {
            Mode::Drag => "Card moved",
            Mode::Resize => "Card resized",
        };
        self.session.finishMutation(message);
        Some(finalGeometry)
    }

    /// Compile refreshes triggered by interactions so far
    pub fn compileRuns(&self) -> usize {
        self.compileRuns.load(Ordering::SeqCst)
    }

    fn compile(&self) {
        self.session.refreshCompiledPrompt(false);
        self.compileRuns.fetch_add(1, Ordering::SeqCst);
    }

    fn writeGeometry(&self, boardId: &str, cardId: &str, g: Geometry) -> bool {
        self.session
            .withCardMut(boardId, cardId, |card| {
                card.x = g.x;
                card.y = g.y;
                card.width = g.width;
                card.height = g.height;
            })
            .is_some()
    }
}
