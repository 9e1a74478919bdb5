//! Name-keyed ownership of every live automation task.
//!
//! The registry mints unique task names, builds periodic tasks from a
//! [`PeriodicKind`], and starts chained tasks that remove themselves once
//! they finish. Tasks are always started and stopped with the map lock
//! released; a task's worker lock may be held while the map lock is taken,
//! never the other way round.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use input_inject::{InputInjector, MouseButton};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    ChainStep, ChainedTask, CompletionCallback, Result, Task, TaskHandle,
    presets::{clicker, fast_clicker, key_presser, runner},
    settings::PeriodicSettings,
};

/// Process-wide counter backing generated task names.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique task name of the form `{base}_{n}`.
pub fn next_task_name(base: &str) -> String {
    let n = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    format!("{base}_{n}")
}

/// Which preset a periodic task is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodicKind {
    /// Mouse autoclicker. `fast` selects the instantaneous-click cadence.
    Clicker {
        /// Button to click.
        button: MouseButton,
        /// Emit one click per interval instead of press/hold/release.
        fast: bool,
    },
    /// Repeated key tap.
    KeyPresser {
        /// Key name, resolved through the injector.
        key: String,
    },
    /// Key held down until stopped.
    Runner {
        /// Key name, resolved through the injector.
        key: String,
    },
}

impl PeriodicKind {
    /// Base used when minting a name for a task of this kind.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Clicker { .. } => "clicker",
            Self::KeyPresser { .. } => "keypresser",
            Self::Runner { .. } => "runner",
        }
    }
}

type TaskMap = Mutex<HashMap<String, TaskHandle>>;

/// Owns named tasks and tears them all down on drop.
pub struct AutomationRegistry {
    /// Injector handed to every preset.
    io: Arc<dyn InputInjector>,
    /// Live tasks by name. Shared weakly with chained completion callbacks.
    tasks: Arc<TaskMap>,
    /// Hold and default interval for periodic tasks.
    periodic: PeriodicSettings,
}

impl fmt::Debug for AutomationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomationRegistry")
            .field("tasks", &self.task_names())
            .field("periodic", &self.periodic)
            .finish_non_exhaustive()
    }
}

impl AutomationRegistry {
    /// Empty registry with default periodic settings.
    pub fn new(io: Arc<dyn InputInjector>) -> Self {
        Self::with_settings(io, &PeriodicSettings::default())
    }

    /// Empty registry using the given periodic settings.
    pub fn with_settings(io: Arc<dyn InputInjector>, periodic: &PeriodicSettings) -> Self {
        Self {
            io,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            periodic: periodic.clone(),
        }
    }

    /// Build and register a periodic task. The task is not started.
    ///
    /// `interval` falls back to the configured default when `None`.
    pub fn create_periodic_task(
        &self,
        kind: &PeriodicKind,
        interval: Option<Duration>,
    ) -> Result<TaskHandle> {
        let interval = interval.unwrap_or_else(|| self.periodic.default_interval());
        let name = next_task_name(kind.base_name());
        let io = self.io.clone();
        let builder = match kind {
            PeriodicKind::Clicker { button, fast: false } => clicker(&name, io, *button, interval),
            PeriodicKind::Clicker { button, fast: true } => {
                fast_clicker(&name, io, *button, interval)
            }
            PeriodicKind::KeyPresser { key } => key_presser(&name, io, key, interval)?,
            PeriodicKind::Runner { key } => runner(&name, io, key, interval)?,
        };
        let task = Arc::new(builder.hold(self.periodic.hold()).build()?);
        let handle = TaskHandle::Periodic(task);
        self.tasks.lock().insert(name.clone(), handle.clone());
        info!(task = %name, ?kind, ?interval, "periodic_task_registered");
        Ok(handle)
    }

    /// Build, register and start a chained task.
    ///
    /// The task removes its own entry when it completes or is stopped. If it
    /// fails to start, the entry is removed and the error returned.
    pub fn create_chained_task(
        &self,
        base: &str,
        steps: Vec<ChainStep>,
        looping: bool,
    ) -> Result<TaskHandle> {
        let name = next_task_name(base);
        let step_count = steps.len();
        let on_complete = unregister_on_complete(Arc::downgrade(&self.tasks));
        let task = Arc::new(ChainedTask::new(&name, steps, looping, Some(on_complete))?);
        let handle = TaskHandle::Chained(task);
        self.tasks.lock().insert(name.clone(), handle.clone());
        info!(task = %name, steps = step_count, looping, "chained_task_registered");

        if let Err(e) = handle.start() {
            let removed = self.tasks.lock().remove(&name);
            drop(removed);
            return Err(e);
        }
        Ok(handle)
    }

    /// Look up a task by name.
    pub fn get_task(&self, name: &str) -> Option<TaskHandle> {
        self.tasks.lock().get(name).cloned()
    }

    /// True if a task with this name is registered.
    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.lock().contains_key(name)
    }

    /// Stop and unregister a task. Returns `false` if the name is unknown.
    pub fn remove_task(&self, name: &str) -> bool {
        let Some(handle) = self.get_task(name) else {
            return false;
        };
        handle.stop();
        // A chained task may already have removed itself during `stop`.
        let removed = self.tasks.lock().remove(name);
        drop(removed);
        info!(task = name, "task_removed");
        true
    }

    /// Stop every registered task and unregister them.
    pub fn stop_all(&self) {
        let snapshot: Vec<(String, TaskHandle)> = self
            .tasks
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if snapshot.is_empty() {
            return;
        }
        for (_, handle) in &snapshot {
            handle.stop();
        }
        let removed: Vec<TaskHandle> = {
            let mut tasks = self.tasks.lock();
            snapshot
                .iter()
                .filter_map(|(name, _)| tasks.remove(name))
                .collect()
        };
        debug!(stopped = snapshot.len(), removed = removed.len(), "stop_all");
    }

    /// Registered task names, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// True if no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Injector shared by every task this registry builds.
    pub fn injector(&self) -> &Arc<dyn InputInjector> {
        &self.io
    }
}

impl Drop for AutomationRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Completion callback that erases the finished chain from the map, if the
/// registry is still alive.
fn unregister_on_complete(tasks: Weak<TaskMap>) -> CompletionCallback {
    Arc::new(move |name: &str| {
        let Some(tasks) = tasks.upgrade() else {
            return;
        };
        // Drop the handle after releasing the lock: it may be the last owner.
        let removed = tasks.lock().remove(name);
        if removed.is_some() {
            debug!(task = name, "chained_task_unregistered");
        }
        drop(removed);
    })
}
