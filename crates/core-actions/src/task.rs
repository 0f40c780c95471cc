//! Cooperative background tasks and their cancellation handles.
//!
//! A task is a unit of work the caller spawns off the event loop (typically
//! via `tokio::spawn`); it receives a [`CancelToken`] it must poll and
//! abandon work on once cancelled. This crate does not spawn anything
//! itself — it only owns the handle shape the dispatcher and event loop
//! share, mirroring the `Arc<AtomicBool>` flag idiom already used for
//! cooperative shutdown in `core-events`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a task currently running in Task mode. Held by the runtime
/// (e.g. `glyph-bin`'s event loop), not by `EditorState` — the editor only
/// knows it is in `Mode::Task`, not what the task is.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: CancelToken,
}

impl TaskHandle {
    pub fn new() -> (Self, CancelToken) {
        let token = CancelToken::new();
        (
            Self {
                token: token.clone(),
            },
            token,
        )
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
