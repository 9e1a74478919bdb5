//! Helpers shared by unit and integration tests.
//! Public so the integration suite under `tests/` can reach them.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::action::{Action, action};

/// Poll `pred` every 2ms until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, pred: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// Thread-safe, timestamped record of labelled calls.
#[derive(Clone)]
pub struct CallLog {
    /// Reference point for timestamps.
    origin: Instant,
    /// Entries in call order.
    entries: Arc<Mutex<Vec<(Duration, String)>>>,
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLog {
    /// Empty log whose clock starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Action that appends `label` each time it runs.
    pub fn recorder(&self, label: &str) -> Action {
        let log = self.clone();
        let label = label.to_string();
        action(move || log.push(&label))
    }

    /// Append an entry now.
    pub fn push(&self, label: &str) {
        let at = self.origin.elapsed();
        self.entries.lock().push((at, label.to_string()));
    }

    /// Labels in call order.
    pub fn labels(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    /// Labels with their offsets from the log's creation.
    pub fn timed(&self) -> Vec<(Duration, String)> {
        self.entries.lock().clone()
    }

    /// Number of entries equal to `label`.
    pub fn count(&self, label: &str) -> usize {
        self.entries.lock().iter().filter(|(_, l)| l == label).count()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
