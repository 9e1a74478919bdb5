//! Periodic press/release task.
//!
//! A [`PeriodicTask`] owns one worker thread while running. Each cycle runs
//! the press action, holds briefly so the target registers the input, runs
//! the release action, then waits out the rest of the interval. All waits are
//! on the task's stop signal, so `stop` never waits for a full interval.
//!
//! Whatever happens, the release action runs once more when the worker
//! exits, so no key or button is left held.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    Error, Result, Task,
    action::{Action, ActionSlot, invoke_guarded, noop},
    signal::Signal,
    task::{WorkerId, join_worker},
};

/// Default time between press and release, long enough for a held key to register.
pub const HOLD_DURATION_MS: u64 = 10;

/// How a cycle drives the press and release actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cadence {
    /// Press, hold, release, then wait the rest of the interval.
    #[default]
    PressRelease,
    /// Fast mode: one instantaneous trigger (the press action) per interval.
    Trigger,
    /// Re-assert the press every interval; release only when stopping.
    Sustain,
}

/// State shared between the task handle and its worker thread.
struct Shared {
    /// Immutable task name.
    name: String,
    /// Full cycle length.
    interval: Mutex<Duration>,
    /// Press-to-release delay within a cycle.
    hold: Duration,
    /// Cycle shape.
    cadence: Cadence,
    /// Press (or trigger) action.
    press: ActionSlot,
    /// Release action.
    release: ActionSlot,
    /// Hook run after the trailing release.
    on_stop: ActionSlot,
    /// Stop request; also the wait primitive for every sleep.
    stop: Signal,
    /// Running flag visible to callers.
    running: AtomicBool,
    /// Set by the worker once its exit sequence (release + hook) has run.
    exited_cleanly: AtomicBool,
    /// Completed cycles since construction.
    cycles: AtomicU64,
    /// Thread running the current (or last) worker loop.
    worker_id: WorkerId,
}

impl Shared {
    /// Run the action currently in `slot` with panic isolation.
    fn invoke(&self, slot: &ActionSlot, what: &str) {
        let action = slot.load();
        invoke_guarded(&self.name, what, || action());
    }

    /// Release and run the stop hook.
    fn finish(&self) {
        self.invoke(&self.release, "release");
        self.invoke(&self.on_stop, "on_stop");
    }
}

/// Builder for [`PeriodicTask`].
pub struct PeriodicBuilder {
    /// Task name.
    name: String,
    /// Cycle length.
    interval: Duration,
    /// Hold duration.
    hold: Duration,
    /// Cycle shape.
    cadence: Cadence,
    /// Press action.
    press: Action,
    /// Release action.
    release: Action,
    /// Stop hook.
    on_stop: Action,
}

impl PeriodicBuilder {
    /// Set the press (or trigger) action.
    pub fn press(mut self, action: Action) -> Self {
        self.press = action;
        self
    }

    /// Set the release action.
    pub fn release(mut self, action: Action) -> Self {
        self.release = action;
        self
    }

    /// Set a hook that runs after the trailing release whenever the task stops.
    pub fn on_stop(mut self, action: Action) -> Self {
        self.on_stop = action;
        self
    }

    /// Override the hold duration.
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Choose the cycle shape.
    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Validate and build the task. The task is created stopped.
    pub fn build(self) -> Result<PeriodicTask> {
        validate_interval(self.interval)?;
        Ok(PeriodicTask {
            shared: Arc::new(Shared {
                name: self.name,
                interval: Mutex::new(self.interval),
                hold: self.hold,
                cadence: self.cadence,
                press: ActionSlot::new(self.press),
                release: ActionSlot::new(self.release),
                on_stop: ActionSlot::new(self.on_stop),
                stop: Signal::new(),
                running: AtomicBool::new(false),
                exited_cleanly: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                worker_id: WorkerId::default(),
            }),
            worker: Mutex::new(None),
        })
    }
}

/// Repeats a press/release cycle on a background thread until stopped.
///
/// Actions may be swapped while running; the change applies from the next
/// cycle. Dropping the task stops it.
pub struct PeriodicTask {
    /// State shared with the worker.
    shared: Arc<Shared>,
    /// Worker handle; the lock serializes start and stop.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Start building a task with no-op actions and the default hold.
    pub fn builder(name: impl Into<String>, interval: Duration) -> PeriodicBuilder {
        PeriodicBuilder {
            name: name.into(),
            interval,
            hold: Duration::from_millis(HOLD_DURATION_MS),
            cadence: Cadence::default(),
            press: noop(),
            release: noop(),
            on_stop: noop(),
        }
    }

    /// Build a press/release task with the default hold.
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        press: Action,
        release: Action,
    ) -> Result<Self> {
        Self::builder(name, interval)
            .press(press)
            .release(release)
            .build()
    }

    /// Replace the press action.
    pub fn set_press_action(&self, action: Action) {
        self.shared.press.store(action);
    }

    /// Replace the release action.
    pub fn set_release_action(&self, action: Action) {
        self.shared.release.store(action);
    }

    /// Change the cycle length. Applies from the next cycle.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        validate_interval(interval)?;
        *self.shared.interval.lock() = interval;
        trace!(task = %self.shared.name, int_ms = interval.as_millis(), "periodic_interval");
        Ok(())
    }

    /// Current cycle length.
    pub fn interval(&self) -> Duration {
        *self.shared.interval.lock()
    }

    /// Press-to-release delay.
    pub fn hold(&self) -> Duration {
        self.shared.hold
    }

    /// Cycle shape.
    pub fn cadence(&self) -> Cadence {
        self.shared.cadence
    }

    /// Number of completed cycles since construction.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }
}

impl Task for PeriodicTask {
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
        self.shared.exited_cleanly.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let thread_name = format!("periodic-{}", self.shared.name);
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run(&shared));
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                trace!(
                    task = %self.shared.name,
                    int_ms = self.interval().as_millis(),
                    cadence = ?self.shared.cadence,
                    "periodic_start"
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
        // The worker runs the exit sequence on its way out; the next `start` joins it.
        if self.shared.worker_id.is_current() {
            trace!(task = %self.shared.name, "periodic_self_stop");
            return;
        }

        let mut worker = self.worker.lock();
        // A racing `start` may have reset the signal and spawned a fresh worker.
        self.shared.stop.set();
        self.shared.running.store(false, Ordering::SeqCst);
        join_worker(&self.shared.name, &mut worker);
        if !self.shared.exited_cleanly.load(Ordering::SeqCst) {
            self.shared.finish();
        }
        trace!(task = %self.shared.name, cycles = self.cycles(), "periodic_stop");
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reject zero-length intervals.
fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(Error::InvalidInterval(interval));
    }
    Ok(())
}

/// Worker loop.
fn run(s: &Shared) {
    s.worker_id.claim();
    while !s.stop.is_set() {
        let interval = *s.interval.lock();
        let stopped = match s.cadence {
            Cadence::PressRelease => {
                s.invoke(&s.press, "press");
                // Release even if the stop arrives mid-hold.
                s.stop.wait_timeout(s.hold);
                s.invoke(&s.release, "release");
                s.cycles.fetch_add(1, Ordering::SeqCst);
                interval > s.hold && s.stop.wait_timeout(interval - s.hold)
            }
            Cadence::Trigger | Cadence::Sustain => {
                s.invoke(&s.press, "press");
                s.cycles.fetch_add(1, Ordering::SeqCst);
                s.stop.wait_timeout(interval)
            }
        };
        if stopped {
            break;
        }
    }
    s.finish();
    s.exited_cleanly.store(true, Ordering::SeqCst);
    debug!(task = %s.name, "periodic_worker_exit");
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::AtomicUsize,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{action::action, test_support::wait_until};

    fn counter() -> (Arc<AtomicUsize>, Action) {
        let n = Arc::new(AtomicUsize::new(0));
        let n2 = n.clone();
        (
            n,
            action(move || {
                n2.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn zero_interval_rejected() {
        let err = PeriodicTask::new("t", Duration::ZERO, noop(), noop());
        assert!(matches!(err, Err(Error::InvalidInterval(_))));
    }

    #[test]
    fn start_stop_releases_and_joins() {
        let (presses, press) = counter();
        let (releases, release) = counter();
        let task = PeriodicTask::new("t", Duration::from_millis(50), press, release).unwrap();
        task.start().unwrap();
        assert!(task.is_running());
        task.stop();
        assert!(!task.is_running());
        assert!(task.worker.lock().is_none());
        assert!(releases.load(Ordering::SeqCst) >= 1);
        assert!(releases.load(Ordering::SeqCst) >= presses.load(Ordering::SeqCst));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (_, release) = counter();
        let task =
            PeriodicTask::new("t", Duration::from_millis(20), noop(), release.clone()).unwrap();
        task.stop();
        task.start().unwrap();
        task.start().unwrap();
        task.stop();
        task.stop();
        assert!(!task.is_running());
    }

    #[test]
    fn stop_does_not_wait_for_full_interval() {
        let task = PeriodicTask::new("slow", Duration::from_secs(10), noop(), noop()).unwrap();
        task.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        let t0 = Instant::now();
        task.stop();
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn panicking_press_does_not_kill_worker() {
        let (releases, release) = counter();
        let task = PeriodicTask::new(
            "panicky",
            Duration::from_millis(15),
            action(|| panic!("press failed")),
            release,
        )
        .unwrap();
        task.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        assert!(task.is_running());
        task.stop();
        assert!(task.cycles() >= 2);
        assert!(releases.load(Ordering::SeqCst) as u64 > task.cycles());
    }

    #[test]
    fn swap_press_action_while_running() {
        let (first, a) = counter();
        let (second, b) = counter();
        let task = PeriodicTask::new("swap", Duration::from_millis(15), a, noop()).unwrap();
        task.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        task.set_press_action(b);
        let before = first.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(60));
        task.stop();
        assert!(before >= 1);
        // At most one cycle can have loaded the old action before the swap landed.
        assert!(first.load(Ordering::SeqCst) <= before + 1);
        assert!(second.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn trigger_cadence_skips_per_cycle_release() {
        let (triggers, trigger) = counter();
        let (releases, release) = counter();
        let task = PeriodicTask::builder("fast", Duration::from_millis(20))
            .press(trigger)
            .release(release)
            .cadence(Cadence::Trigger)
            .build()
            .unwrap();
        task.start().unwrap();
        thread::sleep(Duration::from_millis(90));
        task.stop();
        assert!(triggers.load(Ordering::SeqCst) >= 2);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_stop_runs_once_per_stop_and_restart_works() {
        let (stops, hook) = counter();
        let task = PeriodicTask::builder("hooked", Duration::from_millis(20))
            .on_stop(hook)
            .build()
            .unwrap();
        task.start().unwrap();
        task.stop();
        task.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        task.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn interval_update_is_validated() {
        let task = PeriodicTask::new("iv", Duration::from_millis(20), noop(), noop()).unwrap();
        assert!(task.set_interval(Duration::ZERO).is_err());
        task.set_interval(Duration::from_millis(75)).unwrap();
        assert_eq!(task.interval(), Duration::from_millis(75));
        assert_eq!(task.hold(), Duration::from_millis(HOLD_DURATION_MS));
    }

    #[test]
    fn restart_after_self_stop_waits_for_old_worker() {
        let task = Arc::new(
            PeriodicTask::new("selfstop", Duration::from_millis(10), noop(), noop()).unwrap(),
        );
        let presses: Arc<Mutex<Vec<thread::ThreadId>>> = Arc::new(Mutex::new(Vec::new()));
        let stopped_once = Arc::new(AtomicBool::new(false));
        let me = Arc::downgrade(&task);
        let log = presses.clone();
        task.set_press_action(action(move || {
            log.lock().push(thread::current().id());
            if !stopped_once.swap(true, Ordering::SeqCst) {
                if let Some(me) = me.upgrade() {
                    me.stop();
                }
                // Keep the old worker alive across the restart below.
                thread::sleep(Duration::from_millis(30));
            }
        }));

        task.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || !task.is_running()));
        task.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        task.stop();

        let presses = presses.lock();
        let first = presses[0];
        assert_eq!(presses.iter().filter(|id| **id == first).count(), 1);
        assert!(presses.len() >= 2);
        let workers: HashSet<_> = presses.iter().collect();
        assert_eq!(workers.len(), 2);
    }

    #[test]
    fn drop_stops_worker() {
        let (releases, release) = counter();
        {
            let task =
                PeriodicTask::new("dropped", Duration::from_millis(20), noop(), release).unwrap();
            task.start().unwrap();
        }
        let seen = releases.load(Ordering::SeqCst);
        assert!(seen >= 1);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(releases.load(Ordering::SeqCst), seen);
    }
}
