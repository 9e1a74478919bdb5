//! Sequential, cancellable, optionally looping action chains.
//!
//! A [`ChainedTask`] walks a fixed list of [`ChainStep`]s on its own worker
//! thread. Each step's delay is waited *before* the step runs, except for the
//! very first step of a run, which fires immediately. When looping, step 0's
//! delay applies on every wrap-around. A non-looping chain ends right after
//! its last step with no trailing wait.
//!
//! The completion callback fires exactly once per run, whether the run ends
//! naturally or through [`Task::stop`].

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::{
    Error, Result, Task,
    action::{Action, invoke_guarded, panic_message},
    signal::Signal,
    task::{WorkerId, join_worker},
};

/// Callback invoked with the task name when a run completes.
pub type CompletionCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// One action in a chain and the delay that precedes it.
#[derive(Clone)]
pub struct ChainStep {
    /// Action to run.
    pub action: Action,
    /// Wait before running `action` (ignored for the first step of a run).
    pub delay: Duration,
}

impl ChainStep {
    /// Build a step.
    pub fn new(action: Action, delay: Duration) -> Self {
        Self { action, delay }
    }
}

impl fmt::Debug for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainStep")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// State shared between the task handle and its worker.
struct Shared {
    /// Immutable task name.
    name: String,
    /// Immutable, non-empty step list.
    steps: Vec<ChainStep>,
    /// Wrap to step 0 after the last step.
    looping: bool,
    /// Fired once per run.
    on_complete: Option<CompletionCallback>,
    /// Stop request; wakes inter-step waits.
    stop: Signal,
    /// Running flag.
    running: AtomicBool,
    /// Single-flag guard for the completion callback of the current run.
    notified: AtomicBool,
    /// Index of the step most recently started.
    index: AtomicUsize,
    /// Completed passes over the step list.
    runs: AtomicU64,
    /// Thread running the current (or last) worker loop.
    worker_id: WorkerId,
}

impl Shared {
    /// Fire the completion callback unless this run already did.
    fn notify_once(&self) {
        if self.notified.swap(true, Ordering::SeqCst) {
            return;
        }
        trace!(task = %self.name, "chain_complete");
        if let Some(cb) = &self.on_complete {
            invoke_guarded(&self.name, "on_complete", || cb(&self.name));
        }
    }

    /// Run step `index`, catching and logging a panic.
    fn run_step(&self, index: usize) {
        self.index.store(index, Ordering::SeqCst);
        let action = &self.steps[index].action;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action())) {
            error!(
                task = %self.name,
                index,
                panic = %panic_message(payload.as_ref()),
                "chain_step_panicked"
            );
        }
    }
}

/// Runs an ordered list of steps on a background thread.
///
/// Dropping the task stops it.
pub struct ChainedTask {
    /// State shared with the worker.
    shared: Arc<Shared>,
    /// Worker handle; the lock serializes start and stop.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChainedTask {
    /// Build a stopped chain. Fails if `steps` is empty.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<ChainStep>,
        looping: bool,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Self> {
        let name = name.into();
        if steps.is_empty() {
            return Err(Error::EmptyChain { name });
        }
        Ok(Self {
            shared: Arc::new(Shared {
                name,
                steps,
                looping,
                on_complete,
                stop: Signal::new(),
                running: AtomicBool::new(false),
                notified: AtomicBool::new(false),
                index: AtomicUsize::new(0),
                runs: AtomicU64::new(0),
                worker_id: WorkerId::default(),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.shared.steps.len()
    }

    /// Always false; empty chains cannot be built.
    pub fn is_empty(&self) -> bool {
        self.shared.steps.is_empty()
    }

    /// Whether the chain wraps around after its last step.
    pub fn is_looping(&self) -> bool {
        self.shared.looping
    }

    /// Index of the step most recently started.
    pub fn current_index(&self) -> usize {
        self.shared.index.load(Ordering::SeqCst)
    }

    /// Completed passes over the whole step list.
    pub fn runs(&self) -> u64 {
        self.shared.runs.load(Ordering::SeqCst)
    }
}

impl Task for ChainedTask {
    fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.shared.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        // A worker that stopped its own task may still be winding down.
        if !join_worker(&self.shared.name, &mut worker) {
            warn!(task = %self.shared.name, "restart_from_own_worker_ignored");
            return Ok(());
        }

        self.shared.stop.reset();
        self.shared.notified.store(false, Ordering::SeqCst);
        self.shared.index.store(0, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let thread_name = format!("chain-{}", self.shared.name);
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run(&shared));
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                trace!(
                    task = %self.shared.name,
                    steps = self.shared.steps.len(),
                    looping = self.shared.looping,
                    "chain_start"
                );
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(Error::spawn(thread_name, e))
            }
        }
    }

    fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.stop.set();
        // The worker cannot join itself; the next `start` joins it instead.
        if self.shared.worker_id.is_current() {
            self.shared.notify_once();
            trace!(task = %self.shared.name, "chain_self_stop");
            return;
        }

        let mut worker = self.worker.lock();
        // A racing `start` may have reset the signal and spawned a fresh worker.
        self.shared.stop.set();
        self.shared.running.store(false, Ordering::SeqCst);
        join_worker(&self.shared.name, &mut worker);
        self.shared.notify_once();
        trace!(task = %self.shared.name, index = self.current_index(), "chain_stop");
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

impl Drop for ChainedTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker loop.
fn run(s: &Shared) {
    s.worker_id.claim();
    let len = s.steps.len();
    let mut index = 0;
    let mut first = true;
    let finished = loop {
        if !first && s.stop.wait_timeout(s.steps[index].delay) {
            break false;
        }
        if s.stop.is_set() {
            break false;
        }
        first = false;
        s.run_step(index);

        index += 1;
        if index == len {
            s.runs.fetch_add(1, Ordering::SeqCst);
            if !s.looping {
                break true;
            }
            index = 0;
        }
    };

    if finished {
        // Natural end: notify before clearing the flag so a new start cannot overlap it.
        s.notify_once();
        s.running.store(false, Ordering::SeqCst);
    }
    debug!(task = %s.name, finished, "chain_worker_exit");
}
