//! Bounded worker pool for one-shot hotkey callbacks.
//!
//! [`BoundedExecutor`] runs submitted callbacks on a fixed set of worker
//! threads. At most `capacity` jobs may be outstanding (queued or running);
//! further submissions are rejected immediately instead of blocking the
//! hotkey thread.
//!
//! Overrun detection is handled by a single watchdog thread holding a
//! min-heap of deadlines. A job that misses its deadline is flagged and
//! reported, never interrupted: the callback always runs to completion.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::BinaryHeap,
    mem,
    panic::{self, AssertUnwindSafe},
    result::Result as StdResult,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{self as chan, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use thiserror::Error as ThisError;
use tracing::{debug, error, trace, warn};

use crate::{
    Error, Result, action::panic_message, settings::ExecutorSettings, signal::Signal,
};

/// Poll interval used when waiting for threads to finish during shutdown.
pub const STOP_POLL_INTERVAL_MS: u64 = 2;

/// Watchdog heap size above which completed entries are pruned eagerly.
const PRUNE_THRESHOLD: usize = 1024;

/// Boxed one-shot callback.
type Callback = Box<dyn FnOnce() + Send>;

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum Rejected {
    /// `capacity` jobs are already outstanding.
    #[error("executor queue is full")]
    QueueFull,
    /// `shutdown` has been called.
    #[error("executor is shutting down")]
    ShuttingDown,
}

/// Observer for executor events, for external monitoring.
pub trait ExecutorObserver: Send + Sync {
    /// A job exceeded its timeout budget. It keeps running.
    fn on_timeout(&self, _job: u64, _budget: Duration) {}
    /// A job's callback panicked. The worker survived.
    fn on_fault(&self, _job: u64, _message: &str) {}
}

/// Snapshot of executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Accepted submissions.
    pub submitted: u64,
    /// Refused submissions.
    pub rejected: u64,
    /// Jobs whose callback has returned (including panics).
    pub completed: u64,
    /// Jobs whose callback panicked.
    pub faulted: u64,
    /// Jobs flagged by the watchdog.
    pub timed_out: u64,
    /// Jobs accepted but not yet completed.
    pub outstanding: usize,
    /// Highest `outstanding` seen.
    pub peak_outstanding: usize,
}

/// A submitted callback with its completion signal and timeout state.
struct Job {
    /// Executor-unique id.
    id: u64,
    /// Taken exactly once by the worker that runs it.
    callback: Mutex<Option<Callback>>,
    /// Set once, after the callback returns.
    done: Signal,
    /// Budget measured from acceptance.
    timeout: Duration,
    /// Set by the watchdog if the budget elapsed before `done`.
    timed_out: AtomicBool,
}

/// Caller's view of an accepted job.
#[derive(Clone)]
pub struct JobHandle {
    /// Shared job state.
    job: Arc<Job>,
}

impl JobHandle {
    /// Executor-unique id of the job.
    pub fn id(&self) -> u64 {
        self.job.id
    }

    /// True once the callback has returned.
    pub fn is_done(&self) -> bool {
        self.job.done.is_set()
    }

    /// True if the watchdog saw the budget elapse before completion.
    pub fn timed_out(&self) -> bool {
        self.job.timed_out.load(Ordering::SeqCst)
    }

    /// Timeout budget this job was submitted with.
    pub fn timeout(&self) -> Duration {
        self.job.timeout
    }

    /// Wait up to `timeout` for completion. Returns `is_done()`.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.job.done.wait_timeout(timeout)
    }
}

/// Counters and hooks shared by the executor, its workers and the watchdog.
#[derive(Default)]
struct Shared {
    /// Accepted submissions.
    submitted: AtomicU64,
    /// Refused submissions.
    rejected: AtomicU64,
    /// Finished callbacks.
    completed: AtomicU64,
    /// Panicked callbacks.
    faulted: AtomicU64,
    /// Flagged overruns.
    timed_out: AtomicU64,
    /// Accepted but unfinished jobs.
    outstanding: AtomicUsize,
    /// High-water mark of `outstanding`.
    peak: AtomicUsize,
    /// Optional observer.
    observer: RwLock<Option<Arc<dyn ExecutorObserver>>>,
}

impl Shared {
    /// Clone the observer out so it is never called under the lock.
    fn observer(&self) -> Option<Arc<dyn ExecutorObserver>> {
        self.observer.read().clone()
    }

    /// Reserve an outstanding slot if fewer than `capacity` are taken.
    fn reserve(&self, capacity: usize) -> bool {
        let reserved = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < capacity).then_some(n + 1)
            });
        match reserved {
            Ok(prev) => {
                self.peak.fetch_max(prev + 1, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    /// Give back a slot taken by `reserve`.
    fn release(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Run one job on the current worker thread.
    fn run(&self, worker: usize, job: &Job) {
        let callback = job.callback.lock().take();
        if let Some(cb) = callback {
            trace!(worker, job = job.id, "job_start");
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cb)) {
                let msg = panic_message(payload.as_ref());
                error!(worker, job = job.id, panic = %msg, "job_panicked");
                self.faulted.fetch_add(1, Ordering::SeqCst);
                if let Some(obs) = self.observer() {
                    obs.on_fault(job.id, &msg);
                }
            }
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.release();
        job.done.set();
    }

    /// Flag a job whose deadline passed before completion.
    fn flag_timeout(&self, job: &Job) {
        if job.done.is_set() {
            return;
        }
        job.timed_out.store(true, Ordering::SeqCst);
        self.timed_out.fetch_add(1, Ordering::SeqCst);
        warn!(
            job = job.id,
            budget_ms = job.timeout.as_millis(),
            "job_timed_out"
        );
        if let Some(obs) = self.observer() {
            obs.on_timeout(job.id, job.timeout);
        }
    }
}

/// Fixed-size worker pool over a capacity-bounded queue.
pub struct BoundedExecutor {
    /// Queue sender; `None` once shutdown has begun.
    queue: Mutex<Option<Sender<Arc<Job>>>>,
    /// Counters and observer.
    shared: Arc<Shared>,
    /// Worker handles, drained by shutdown.
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Deadline tracker.
    watchdog: Watchdog,
    /// Next job id.
    next_id: AtomicU64,
    /// Maximum outstanding jobs.
    capacity: usize,
    /// Timeout used by `submit_default`.
    default_timeout: Duration,
    /// Deadline used when the executor is dropped.
    shutdown_deadline: Duration,
}

impl BoundedExecutor {
    /// Start `workers` threads serving at most `capacity` outstanding jobs.
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        Self::from_settings(&ExecutorSettings {
            workers,
            capacity,
            ..ExecutorSettings::default()
        })
    }

    /// Start an executor from validated settings.
    pub fn from_settings(settings: &ExecutorSettings) -> Result<Self> {
        settings.validate()?;
        let (tx, rx) = chan::bounded::<Arc<Job>>(settings.capacity);
        let shared = Arc::new(Shared::default());
        let watchdog = Watchdog::spawn(shared.clone())?;

        let mut handles = Vec::with_capacity(settings.workers);
        for index in 0..settings.workers {
            let rx = rx.clone();
            let shared = shared.clone();
            let name = format!("executor-worker-{index}");
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(index, &rx, &shared))
            {
                Ok(h) => handles.push(h),
                Err(e) => {
                    // Disconnect the queue so the workers already spawned exit.
                    drop(tx);
                    watchdog.shutdown(Instant::now() + Duration::from_millis(100));
                    return Err(Error::spawn(name, e));
                }
            }
        }
        debug!(
            workers = settings.workers,
            capacity = settings.capacity,
            "executor_started"
        );

        Ok(Self {
            queue: Mutex::new(Some(tx)),
            shared,
            workers: Mutex::new(handles),
            watchdog,
            next_id: AtomicU64::new(1),
            capacity: settings.capacity,
            default_timeout: Duration::from_millis(settings.default_timeout_ms),
            shutdown_deadline: Duration::from_millis(settings.shutdown_deadline_ms),
        })
    }

    /// Submit `f` for execution with an overrun budget of `timeout`.
    ///
    /// Never blocks. Returns [`Rejected::QueueFull`] when `capacity` jobs are
    /// outstanding and [`Rejected::ShuttingDown`] after `shutdown`.
    pub fn submit<F>(&self, f: F, timeout: Duration) -> StdResult<JobHandle, Rejected>
    where
        F: FnOnce() + Send + 'static,
    {
        let queue = self.queue.lock();
        let Some(tx) = queue.as_ref() else {
            return Err(self.reject(Rejected::ShuttingDown));
        };
        if !self.shared.reserve(self.capacity) {
            return Err(self.reject(Rejected::QueueFull));
        }

        let job = Arc::new(Job {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            callback: Mutex::new(Some(Box::new(f))),
            done: Signal::new(),
            timeout,
            timed_out: AtomicBool::new(false),
        });
        if let Err(e) = tx.try_send(job.clone()) {
            self.shared.release();
            return Err(self.reject(match e {
                TrySendError::Full(_) => Rejected::QueueFull,
                TrySendError::Disconnected(_) => Rejected::ShuttingDown,
            }));
        }
        drop(queue);

        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        self.watchdog.watch(job.clone());
        trace!(job = job.id, timeout_ms = timeout.as_millis(), "job_submitted");
        Ok(JobHandle { job })
    }

    /// Submit with the configured default timeout.
    pub fn submit_default<F>(&self, f: F) -> StdResult<JobHandle, Rejected>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(f, self.default_timeout)
    }

    /// Install an observer for timeouts and faults.
    pub fn set_observer(&self, observer: Arc<dyn ExecutorObserver>) {
        *self.shared.observer.write() = Some(observer);
    }

    /// Current counters.
    pub fn stats(&self) -> ExecutorStats {
        let s = &self.shared;
        ExecutorStats {
            submitted: s.submitted.load(Ordering::SeqCst),
            rejected: s.rejected.load(Ordering::SeqCst),
            completed: s.completed.load(Ordering::SeqCst),
            faulted: s.faulted.load(Ordering::SeqCst),
            timed_out: s.timed_out.load(Ordering::SeqCst),
            outstanding: s.outstanding.load(Ordering::SeqCst),
            peak_outstanding: s.peak.load(Ordering::SeqCst),
        }
    }

    /// Maximum number of outstanding jobs, counting queued and running ones.
    ///
    /// A capacity below the worker count leaves the extra workers idle.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once `shutdown` has started.
    pub fn is_shutting_down(&self) -> bool {
        self.queue.lock().is_none()
    }

    /// Stop accepting work, let workers drain the queue, and join them.
    ///
    /// Waits at most `deadline` in total. Threads still running after that
    /// are abandoned (logged, never killed). Returns `true` if every thread
    /// joined in time. Calling it again is harmless.
    pub fn shutdown(&self, deadline: Duration) -> bool {
        let end = Instant::now()
            .checked_add(deadline)
            .unwrap_or_else(|| Instant::now() + self.shutdown_deadline);
        if self.queue.lock().take().is_some() {
            debug!(outstanding = self.stats().outstanding, "executor_shutdown");
        }

        let handles = mem::take(&mut *self.workers.lock());
        let mut all_joined = true;
        for handle in handles {
            all_joined &= join_before(handle, end);
        }
        all_joined &= self.watchdog.shutdown(end);
        all_joined
    }

    /// Count and log a rejection.
    fn reject(&self, why: Rejected) -> Rejected {
        self.shared.rejected.fetch_add(1, Ordering::SeqCst);
        trace!(reason = %why, "job_rejected");
        why
    }
}

impl Drop for BoundedExecutor {
    fn drop(&mut self) {
        self.shutdown(self.shutdown_deadline);
    }
}

/// Pull jobs until the queue is closed and drained.
fn worker_loop(index: usize, rx: &Receiver<Arc<Job>>, shared: &Shared) {
    while let Ok(job) = rx.recv() {
        shared.run(index, &job);
    }
    debug!(worker = index, "executor_worker_exit");
}

/// Join `handle` if it finishes before `end`; otherwise abandon it.
fn join_before(handle: JoinHandle<()>, end: Instant) -> bool {
    let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
    if handle.thread().id() == thread::current().id() {
        warn!(thread = %name, "shutdown_from_own_thread_detached");
        return false;
    }
    while !handle.is_finished() && Instant::now() < end {
        thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
    }
    if handle.is_finished() {
        if handle.join().is_err() {
            warn!(thread = %name, "thread_panicked");
        }
        true
    } else {
        warn!(thread = %name, "thread_leaked_past_deadline");
        false
    }
}

/// Message to the watchdog thread.
enum WatchMsg {
    /// Track a newly accepted job.
    Watch(Arc<Job>),
    /// Exit the loop.
    Stop,
}

/// Heap entry ordered so the earliest deadline is on top.
struct Deadline {
    /// When the job's budget runs out.
    at: Instant,
    /// The job being watched.
    job: Arc<Job>,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.job.id.cmp(&self.job.id))
    }
}

/// Single thread that flags overrunning jobs.
struct Watchdog {
    /// Message channel into the loop.
    tx: Sender<WatchMsg>,
    /// Loop thread, taken on shutdown.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Watchdog {
    /// Spawn the watchdog loop.
    fn spawn(shared: Arc<Shared>) -> Result<Self> {
        let (tx, rx) = chan::unbounded();
        let name = "executor-watchdog";
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || watchdog_loop(&rx, &shared))
            .map_err(|e| Error::spawn(name, e))?;
        Ok(Self {
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Start tracking `job`.
    fn watch(&self, job: Arc<Job>) {
        if self.tx.send(WatchMsg::Watch(job)).is_err() {
            trace!("watchdog_gone");
        }
    }

    /// Stop the loop and join it before `end`.
    fn shutdown(&self, end: Instant) -> bool {
        let Some(handle) = self.handle.lock().take() else {
            return true;
        };
        let _ignored = self.tx.send(WatchMsg::Stop);
        join_before(handle, end)
    }
}

/// Watchdog loop: sleep until the nearest deadline or the next message.
fn watchdog_loop(rx: &Receiver<WatchMsg>, shared: &Shared) {
    let mut heap: BinaryHeap<Deadline> = BinaryHeap::new();
    loop {
        let msg = match heap.peek() {
            Some(next) => rx.recv_deadline(next.at),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match msg {
            Ok(WatchMsg::Watch(job)) => match Instant::now().checked_add(job.timeout) {
                Some(at) => {
                    heap.push(Deadline { at, job });
                    if heap.len() > PRUNE_THRESHOLD {
                        heap.retain(|d| !d.job.done.is_set());
                    }
                }
                None => trace!(job = job.id, "timeout_unbounded"),
            },
            Ok(WatchMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        while heap.peek().is_some_and(|d| d.at <= now) {
            if let Some(d) = heap.pop() {
                shared.flag_timeout(&d.job);
            }
        }
    }
    debug!(pending = heap.len(), "executor_watchdog_exit");
}

#[cfg(test)]
mod tests {
    use std::iter;

    use super::*;

    #[test]
    fn rejects_zero_sizes() {
        assert!(matches!(
            BoundedExecutor::new(0, 4),
            Err(Error::InvalidSettings(_))
        ));
        assert!(matches!(
            BoundedExecutor::new(2, 0),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn runs_submitted_callback() {
        let exec = BoundedExecutor::new(2, 4).unwrap();
        let hit = Arc::new(AtomicBool::new(false));
        let h = hit.clone();
        let handle = exec
            .submit(
                move || h.store(true, Ordering::SeqCst),
                Duration::from_secs(1),
            )
            .unwrap();
        assert!(handle.wait(Duration::from_secs(2)));
        assert!(hit.load(Ordering::SeqCst));
        assert!(!handle.timed_out());
        assert!(exec.shutdown(Duration::from_secs(2)));
    }

    #[test]
    fn deadline_heap_orders_earliest_first() {
        let now = Instant::now();
        let job = |id| {
            Arc::new(Job {
                id,
                callback: Mutex::new(None),
                done: Signal::new(),
                timeout: Duration::ZERO,
                timed_out: AtomicBool::new(false),
            })
        };
        let mut heap = BinaryHeap::new();
        heap.push(Deadline {
            at: now + Duration::from_millis(30),
            job: job(1),
        });
        heap.push(Deadline {
            at: now + Duration::from_millis(10),
            job: job(2),
        });
        heap.push(Deadline {
            at: now + Duration::from_millis(20),
            job: job(3),
        });
        let order: Vec<u64> = iter::from_fn(|| heap.pop().map(|d| d.job.id)).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn panicking_job_completes_and_worker_survives() {
        let exec = BoundedExecutor::new(1, 4).unwrap();
        let bad = exec
            .submit(|| panic!("callback fault"), Duration::from_secs(5))
            .unwrap();
        assert!(bad.wait(Duration::from_secs(2)));
        assert!(!bad.timed_out());

        let good = exec.submit(|| {}, Duration::from_secs(5)).unwrap();
        assert!(good.wait(Duration::from_secs(2)));
        let stats = exec.stats();
        assert_eq!(stats.faulted, 1);
        assert_eq!(stats.completed, 2);
    }

    #[test]
    fn shutdown_is_idempotent_and_rejects_afterwards() {
        let exec = BoundedExecutor::new(2, 2).unwrap();
        assert!(exec.shutdown(Duration::from_secs(2)));
        assert!(exec.is_shutting_down());
        assert!(exec.shutdown(Duration::from_secs(2)));
        assert_eq!(
            exec.submit(|| {}, Duration::from_secs(1)).err(),
            Some(Rejected::ShuttingDown)
        );
        assert_eq!(exec.stats().rejected, 1);
    }

    #[test]
    fn shutdown_drains_jobs_queued_behind_a_busy_worker() {
        let exec = BoundedExecutor::new(1, 8).unwrap();
        let (release_tx, release_rx) = chan::bounded::<()>(0);
        let blocker = exec
            .submit(
                move || {
                    let _ignored = release_rx.recv();
                },
                Duration::from_secs(5),
            )
            .unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let queued: Vec<JobHandle> = (0..3)
            .map(|_| {
                let ran = ran.clone();
                exec.submit(
                    move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                    },
                    Duration::from_secs(5),
                )
                .unwrap()
            })
            .collect();
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let _ignored = release_tx.send(());
        });
        assert!(exec.shutdown(Duration::from_secs(2)));
        releaser.join().unwrap();

        assert!(blocker.is_done());
        assert!(queued.iter().all(JobHandle::is_done));
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        let stats = exec.stats();
        assert_eq!(stats.completed, 4);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn shutdown_gives_up_at_deadline_but_job_still_finishes() {
        let exec = BoundedExecutor::new(1, 2).unwrap();
        let slow = exec
            .submit(
                || thread::sleep(Duration::from_millis(300)),
                Duration::from_secs(5),
            )
            .unwrap();
        // Let the worker pick the job up before closing the queue.
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        assert!(!exec.shutdown(Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(!slow.is_done());

        assert!(slow.wait(Duration::from_secs(2)));
        assert!(!slow.timed_out());
    }

    #[test]
    fn capacity_below_worker_count_counts_running_jobs() {
        let exec = BoundedExecutor::new(4, 1).unwrap();
        assert_eq!(exec.capacity(), 1);
        let (gate_tx, gate_rx) = chan::bounded::<()>(0);
        let running = exec
            .submit(
                move || {
                    let _ignored = gate_rx.recv_timeout(Duration::from_secs(5));
                },
                Duration::from_secs(10),
            )
            .unwrap();
        assert_eq!(
            exec.submit(|| {}, Duration::from_secs(1)).err(),
            Some(Rejected::QueueFull)
        );
        drop(gate_tx);
        assert!(running.wait(Duration::from_secs(2)));
        assert!(exec.submit(|| {}, Duration::from_secs(1)).is_ok());
        assert!(exec.shutdown(Duration::from_secs(2)));
    }
}
