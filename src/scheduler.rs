// Debounced side effects
// Each trigger replaces the pending timer; only the last one fires

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Action = Box<dyn FnOnce() + Send + 'static>;

struct Pending {
    token: CancellationToken,
    action: Arc<Mutex<Option<Action>>>,
}

/// Timer handle with trigger / cancel / flush. Needs a tokio runtime;
/// tests drive it with paused virtual time.
pub struct Debouncer {
    label: &'static str,
    delay: Duration,
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    pub fn new(label: &'static str, delay: Duration) -> Self {
        Self {
            label,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` after the delay, cancelling any earlier trigger
    pub fn trigger<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let slot: Arc<Mutex<Option<Action>>> = Arc::new(Mutex::new(Some(Box::new(action))));

        if let Some(previous) = self.pending.lock().replace(Pending {
            token: token.clone(),
            action: slot.clone(),
        }) {
            previous.token.cancel();
            previous.action.lock().take();
        }

        let delay = self.delay;
        let label = self.label;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("[Debouncer:{}] Superseded", label);
                }
                _ = tokio::time::sleep(delay) => {
                    let action = slot.lock().take();
                    if let Some(action) = action {
                        debug!("[Debouncer:{}] Firing", label);
                        action();
                    }
                }
            }
        });
    }

    /// Drop the pending action without running it
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(pending) => {
                pending.token.cancel();
                pending.action.lock().take().is_some()
            }
            None => false,
        }
    }

    /// Run the pending action now. Returns false when nothing was pending.
    pub fn flush(&self) -> bool {
        let Some(pending) = self.pending.lock().take() else {
            return false;
        };
        pending.token.cancel();
        let action = pending.action.lock().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    pub fn isPending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|p| p.action.lock().is_some())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
