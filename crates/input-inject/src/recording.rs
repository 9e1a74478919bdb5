//! In-memory injector used by tests.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{ButtonAction, InputInjector, KeyId, MouseButton, Result};

/// One recorded injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A mouse button action.
    Click {
        /// Button acted on.
        button: MouseButton,
        /// What happened to it.
        action: ButtonAction,
    },
    /// A key press or release.
    Key {
        /// Key acted on.
        key: KeyId,
        /// `true` for press, `false` for release.
        pressed: bool,
    },
}

/// Injector that records every call with a timestamp relative to creation.
#[derive(Clone)]
pub struct RecordingInjector {
    /// Creation time; offsets are measured from here.
    origin: Instant,
    /// Recorded events in call order.
    events: Arc<Mutex<Vec<(Duration, InputEvent)>>>,
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingInjector {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().iter().map(|(_, e)| *e).collect()
    }

    /// Snapshot of recorded events with their offsets from creation.
    pub fn timed_events(&self) -> Vec<(Duration, InputEvent)> {
        self.events.lock().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Count recorded clicks with the given button and action.
    pub fn count_clicks(&self, button: MouseButton, action: ButtonAction) -> usize {
        self.count(InputEvent::Click { button, action })
    }

    /// Count recorded key events with the given key and direction.
    pub fn count_keys(&self, key: KeyId, pressed: bool) -> usize {
        self.count(InputEvent::Key { key, pressed })
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<InputEvent> {
        self.events.lock().last().map(|(_, e)| *e)
    }

    fn count(&self, want: InputEvent) -> usize {
        self.events.lock().iter().filter(|(_, e)| *e == want).count()
    }

    fn push(&self, event: InputEvent) {
        let at = self.origin.elapsed();
        self.events.lock().push((at, event));
    }
}

impl InputInjector for RecordingInjector {
    fn click(&self, button: MouseButton, action: ButtonAction) -> Result<()> {
        self.push(InputEvent::Click { button, action });
        Ok(())
    }

    fn send_key(&self, key: KeyId, pressed: bool) -> Result<()> {
        self.push(InputEvent::Key { key, pressed });
        Ok(())
    }
}
