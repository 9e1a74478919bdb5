//! Shared action callbacks and fault-isolated invocation.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::error;

/// A callback run by a task worker. Cheap to clone; invoked without locks held.
pub type Action = Arc<dyn Fn() + Send + Sync>;

/// Wrap a closure as an [`Action`].
pub fn action<F>(f: F) -> Action
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An action that does nothing.
pub fn noop() -> Action {
    Arc::new(|| {})
}

/// Hot-swappable action slot.
///
/// The lock is held only while cloning or replacing the `Arc`, never while
/// the action runs, so a slow callback cannot block a concurrent swap.
pub(crate) struct ActionSlot {
    /// Current action.
    inner: RwLock<Action>,
}

impl ActionSlot {
    /// Create a slot holding `action`.
    pub(crate) fn new(action: Action) -> Self {
        Self {
            inner: RwLock::new(action),
        }
    }

    /// Clone out the current action.
    pub(crate) fn load(&self) -> Action {
        self.inner.read().clone()
    }

    /// Replace the current action; takes effect on the next load.
    pub(crate) fn store(&self, action: Action) {
        *self.inner.write() = action;
    }
}

/// Run `f`, catching any panic. Returns `false` and logs if it panicked.
///
/// `task` and `what` identify the failing call site in the log.
pub(crate) fn invoke_guarded(task: &str, what: &str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                task,
                what,
                panic = %panic_message(payload.as_ref()),
                "action_panicked"
            );
            false
        }
    }
}

/// Best-effort text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
