//! The task capability and the closed set of task kinds.

use std::{
    fmt,
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{ChainedTask, PeriodicTask, Result};

/// A named, independently startable and stoppable unit of background work.
///
/// `stop` is synchronous: when it returns, the task's worker has exited and
/// no further side effects from it will occur.
pub trait Task: Send + Sync {
    /// Launch the worker. No-op if already running.
    fn start(&self) -> Result<()>;

    /// Request the worker to exit and wait for it. No-op if not running.
    fn stop(&self);

    /// True between a successful `start` and the matching `stop` (or natural exit).
    fn is_running(&self) -> bool;

    /// Unique name of this task.
    fn name(&self) -> &str;

    /// Stop if running, start otherwise.
    fn toggle(&self) -> Result<()> {
        if self.is_running() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }
}

/// Shared handle to any task owned by the registry.
#[derive(Clone)]
pub enum TaskHandle {
    /// Repeating press/release task.
    Periodic(Arc<PeriodicTask>),
    /// Sequential step list.
    Chained(Arc<ChainedTask>),
}

impl TaskHandle {
    /// Borrow as a periodic task, if it is one.
    pub fn as_periodic(&self) -> Option<&Arc<PeriodicTask>> {
        match self {
            Self::Periodic(t) => Some(t),
            Self::Chained(_) => None,
        }
    }

    /// Borrow as a chained task, if it is one.
    pub fn as_chained(&self) -> Option<&Arc<ChainedTask>> {
        match self {
            Self::Chained(t) => Some(t),
            Self::Periodic(_) => None,
        }
    }

    /// True if both handles refer to the same task instance.
    pub fn same_task(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Periodic(a), Self::Periodic(b)) => Arc::ptr_eq(a, b),
            (Self::Chained(a), Self::Chained(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// View as a trait object.
    fn inner(&self) -> &dyn Task {
        match self {
            Self::Periodic(t) => t.as_ref(),
            Self::Chained(t) => t.as_ref(),
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Periodic(_) => "Periodic",
            Self::Chained(_) => "Chained",
        };
        f.debug_struct("TaskHandle")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl Task for TaskHandle {
    fn start(&self) -> Result<()> {
        self.inner().start()
    }

    fn stop(&self) {
        self.inner().stop();
    }

    fn is_running(&self) -> bool {
        self.inner().is_running()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

impl From<Arc<PeriodicTask>> for TaskHandle {
    fn from(t: Arc<PeriodicTask>) -> Self {
        Self::Periodic(t)
    }
}

impl From<Arc<ChainedTask>> for TaskHandle {
    fn from(t: Arc<ChainedTask>) -> Self {
        Self::Chained(t)
    }
}

/// Identity of the thread currently serving a task, recorded by that thread.
#[derive(Debug, Default)]
pub(crate) struct WorkerId(Mutex<Option<ThreadId>>);

impl WorkerId {
    /// Record the calling thread as the task's worker.
    pub(crate) fn claim(&self) {
        *self.0.lock() = Some(thread::current().id());
    }

    /// True when called from the task's own worker.
    pub(crate) fn is_current(&self) -> bool {
        *self.0.lock() == Some(thread::current().id())
    }
}

/// Join the worker held in `slot` unless the caller *is* that worker.
///
/// Returns `true` once the slot is empty. A worker cannot join itself, so its
/// handle stays in the slot and the next `start` from another thread joins it
/// before any per-run state is reset.
pub(crate) fn join_worker(task: &str, slot: &mut Option<JoinHandle<()>>) -> bool {
    let Some(handle) = slot.take() else {
        return true;
    };
    if handle.thread().id() == thread::current().id() {
        trace!(task, "join_skipped_on_own_worker");
        *slot = Some(handle);
        return false;
    }
    if handle.join().is_err() {
        warn!(task, "worker_thread_panicked");
    }
    true
}
