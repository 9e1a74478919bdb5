//! Ready-made periodic tasks that drive an [`InputInjector`].
//!
//! These are configuration, not subclasses: each preset only chooses which
//! injector calls to install as the press and release actions and which
//! [`Cadence`] to run them with. Each returns a [`PeriodicBuilder`] so the
//! caller can still adjust the hold or add a stop hook before building.

use std::{sync::Arc, time::Duration};

use input_inject::{ButtonAction, InputInjector, KeyId, MouseButton};
use tracing::warn;

use crate::{
    Error, PeriodicTask, Result,
    action::{Action, action},
    periodic::{Cadence, PeriodicBuilder},
};

/// Autoclicker: hold `button` briefly every `interval`.
pub fn clicker(
    name: impl Into<String>,
    io: Arc<dyn InputInjector>,
    button: MouseButton,
    interval: Duration,
) -> PeriodicBuilder {
    PeriodicTask::builder(name, interval)
        .press(click_action(io.clone(), button, ButtonAction::Press))
        .release(click_action(io, button, ButtonAction::Release))
}

/// Fast autoclicker: one instantaneous click every `interval`.
pub fn fast_clicker(
    name: impl Into<String>,
    io: Arc<dyn InputInjector>,
    button: MouseButton,
    interval: Duration,
) -> PeriodicBuilder {
    PeriodicTask::builder(name, interval)
        .press(click_action(io.clone(), button, ButtonAction::Click))
        .release(click_action(io, button, ButtonAction::Release))
        .cadence(Cadence::Trigger)
}

/// Autokey: tap `key` every `interval`.
pub fn key_presser(
    name: impl Into<String>,
    io: Arc<dyn InputInjector>,
    key: &str,
    interval: Duration,
) -> Result<PeriodicBuilder> {
    let id = resolve_key(io.as_ref(), key)?;
    Ok(PeriodicTask::builder(name, interval)
        .press(key_action(io.clone(), id, true))
        .release(key_action(io, id, false)))
}

/// Autorunner: keep `key` held, re-asserting it every `interval`.
pub fn runner(
    name: impl Into<String>,
    io: Arc<dyn InputInjector>,
    key: &str,
    interval: Duration,
) -> Result<PeriodicBuilder> {
    let id = resolve_key(io.as_ref(), key)?;
    Ok(PeriodicTask::builder(name, interval)
        .press(key_action(io.clone(), id, true))
        .release(key_action(io, id, false))
        .cadence(Cadence::Sustain))
}

/// Resolve a key name through the injector, rejecting empty and unknown names.
pub fn resolve_key(io: &dyn InputInjector, key: &str) -> Result<KeyId> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::EmptyKey);
    }
    io.resolve_key_name(key)
        .ok_or_else(|| Error::UnknownKey(key.to_string()))
}

/// Action that performs one mouse button operation, logging injector failures.
pub fn click_action(
    io: Arc<dyn InputInjector>,
    button: MouseButton,
    what: ButtonAction,
) -> Action {
    action(move || {
        if let Err(e) = io.click(button, what) {
            warn!(%button, action = %what, error = %e, "inject_click_failed");
        }
    })
}

/// Action that presses or releases one key, logging injector failures.
pub fn key_action(io: Arc<dyn InputInjector>, key: KeyId, pressed: bool) -> Action {
    action(move || {
        if let Err(e) = io.send_key(key, pressed) {
            warn!(%key, pressed, error = %e, "inject_key_failed");
        }
    })
}
