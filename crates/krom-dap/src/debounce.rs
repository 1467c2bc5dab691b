//! Single-slot debounce used for the paused overlay.
//!
//! Stepping produces a resume immediately followed by a pause. Hiding the
//! overlay on every resume would make it flicker, so hiding is delayed and
//! the next pause cancels it before it happens.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Pending {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct GateInner {
    delay: Duration,
    next_id: AtomicU64,
    pending: Mutex<Option<Pending>>,
}

/// At most one delayed action at a time.
///
/// Actions run with the gate's slot locked, so they must not call back into
/// the gate. Keep them short; spawn anything that awaits.
pub struct DebounceGate {
    inner: Arc<GateInner>,
}

impl DebounceGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(GateInner {
                delay,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn is_armed(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Run `action` after the delay, unless something is already waiting, in
    /// which case `action` is dropped. Must be called within a tokio runtime.
    pub fn wait<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.inner.pending.lock();
        if pending.is_some() {
            return;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(inner.delay) => {}
            }

            let mut pending = inner.pending.lock();
            if pending.as_ref().is_some_and(|current| current.id == id) {
                *pending = None;
                action();
            }
        });

        *pending = Some(Pending { id, token, handle });
    }

    /// Drop whatever is waiting without running it, then run `action` now.
    pub fn do_and_cancel<F>(&self, action: F)
    where
        F: FnOnce(),
    {
        let mut pending = self.inner.pending.lock();
        if let Some(previous) = pending.take() {
            previous.token.cancel();
            previous.handle.abort();
        }
        action();
    }
}
