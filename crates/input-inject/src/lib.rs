//! Input injection boundary for the autokey engine.
//!
//! The engine never talks to a display server directly. Everything that
//! presses a key or clicks a mouse button goes through an [`InputInjector`],
//! which must be safe to call from arbitrary worker threads and must not
//! block indefinitely.
//!
//! This crate provides:
//! - [`InputInjector`]: the collaborator trait (`click`, `send_key`, `resolve_key_name`)
//! - [`MouseButton`], [`ButtonAction`], [`KeyId`]: the vocabulary shared with callers
//! - [`keysym`]: X11 keysym name resolution
//! - [`LogInjector`]: an injector that only records events to the tracing log
//! - `RecordingInjector` (feature `test-utils`): an in-memory stub for tests
#![warn(missing_docs)]

use std::{fmt, str::FromStr};

use tracing::{info, trace};

mod error;
pub mod keysym;
#[cfg(any(test, feature = "test-utils"))]
mod recording;

pub use error::{Error, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use recording::{InputEvent, RecordingInjector};

/// Mouse buttons understood by the injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
    /// Side button, usually "back".
    Back,
    /// Side button, usually "forward".
    Forward,
}

impl MouseButton {
    /// X11 button number for this button.
    pub fn x11_number(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
            Self::Back => 8,
            Self::Forward => 9,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::Back => "back",
            Self::Forward => "forward",
        };
        f.write_str(s)
    }
}

impl FromStr for MouseButton {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "1" => Ok(Self::Left),
            "middle" | "m" | "2" => Ok(Self::Middle),
            "right" | "r" | "3" => Ok(Self::Right),
            "back" | "x1" | "8" => Ok(Self::Back),
            "forward" | "x2" | "9" => Ok(Self::Forward),
            _ => Err(Error::UnknownButton(s.to_string())),
        }
    }
}

/// What to do with a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    /// Push the button down and keep it held.
    Press,
    /// Let go of a held button.
    Release,
    /// Press and release as a single event.
    Click,
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Press => "press",
            Self::Release => "release",
            Self::Click => "click",
        };
        f.write_str(s)
    }
}

impl FromStr for ButtonAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "press" | "down" => Ok(Self::Press),
            "release" | "up" => Ok(Self::Release),
            "click" => Ok(Self::Click),
            _ => Err(Error::UnknownAction(s.to_string())),
        }
    }
}

/// Resolved key identifier (an X11 keysym).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u32);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match keysym::to_name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

/// The input-injection collaborator consumed by the automation engine.
///
/// Implementations are called from background worker threads, concurrently
/// from independent tasks. They must not block indefinitely.
pub trait InputInjector: Send + Sync {
    /// Perform a mouse button action.
    fn click(&self, button: MouseButton, action: ButtonAction) -> Result<()>;

    /// Press (`pressed == true`) or release a key.
    fn send_key(&self, key: KeyId, pressed: bool) -> Result<()>;

    /// Resolve a human key name such as `"space"` or `"F5"`.
    fn resolve_key_name(&self, name: &str) -> Option<KeyId> {
        keysym::from_name(name)
    }
}

/// Injector that emits each event to the tracing log and does nothing else.
///
/// Useful for dry runs of the CLI and for headless environments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInjector;

impl LogInjector {
    /// Create a new log-only injector.
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for LogInjector {
    fn click(&self, button: MouseButton, action: ButtonAction) -> Result<()> {
        info!(%button, %action, "inject_click");
        Ok(())
    }

    fn send_key(&self, key: KeyId, pressed: bool) -> Result<()> {
        info!(%key, pressed, "inject_key");
        Ok(())
    }

    fn resolve_key_name(&self, name: &str) -> Option<KeyId> {
        let id = keysym::from_name(name);
        trace!(name, ?id, "resolve_key_name");
        id
    }
}
