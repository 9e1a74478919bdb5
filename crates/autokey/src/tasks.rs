//! Periodic and chained automation commands.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use autokey_engine::{
    AutomationRegistry, ChainStep, PeriodicKind, STOP_POLL_INTERVAL_MS, Settings, Task,
    TaskHandle, action,
    presets::{key_action, resolve_key},
};
use input_inject::{InputInjector, LogInjector};
use tracing::info;

use crate::{
    cli::{ChainArgs, ClickArgs, PressArgs, RunArgs},
    error::{Error, Result},
};

/// Registry backed by the logging injector.
fn registry(settings: &Settings) -> AutomationRegistry {
    AutomationRegistry::with_settings(Arc::new(LogInjector::new()), &settings.periodic)
}

/// Start a periodic task, let it run for `run_for`, then stop everything.
fn run_periodic(
    settings: &Settings,
    kind: &PeriodicKind,
    interval: Option<Duration>,
    run_for: Duration,
) -> Result<()> {
    let reg = registry(settings);
    let task = reg.create_periodic_task(kind, interval)?;
    task.start()?;
    info!(task = task.name(), ?run_for, "running");
    thread::sleep(run_for);
    reg.stop_all();
    report(&task);
    Ok(())
}

/// Print a one-line summary for a finished task.
fn report(task: &TaskHandle) {
    if let Some(p) = task.as_periodic() {
        println!("{}: {} cycles", task.name(), p.cycles());
    } else if let Some(c) = task.as_chained() {
        println!("{}: {} passes", task.name(), c.runs());
    }
}

/// `autokey click`
pub fn click(settings: &Settings, args: &ClickArgs) -> Result<()> {
    run_periodic(
        settings,
        &PeriodicKind::Clicker {
            button: args.button,
            fast: args.fast,
        },
        args.interval,
        args.run_for,
    )
}

/// `autokey press`
pub fn press(settings: &Settings, args: &PressArgs) -> Result<()> {
    run_periodic(
        settings,
        &PeriodicKind::KeyPresser {
            key: args.key.clone(),
        },
        args.interval,
        args.run_for,
    )
}

/// `autokey run`
pub fn run(settings: &Settings, args: &RunArgs) -> Result<()> {
    run_periodic(
        settings,
        &PeriodicKind::Runner {
            key: args.key.clone(),
        },
        None,
        args.run_for,
    )
}

/// `autokey chain`
pub fn chain(settings: &Settings, args: &ChainArgs) -> Result<()> {
    let reg = registry(settings);
    let steps = args
        .steps
        .iter()
        .map(|s| chain_step(reg.injector(), s))
        .collect::<Result<Vec<_>>>()?;
    let task = reg.create_chained_task("chain", steps, args.looping)?;
    info!(task = task.name(), looping = args.looping, "running");

    // A finished chain unregisters itself.
    let end = Instant::now() + args.run_for;
    while reg.has_task(task.name()) {
        if Instant::now() >= end {
            info!(task = task.name(), "time_limit_reached");
            break;
        }
        thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
    }
    reg.stop_all();
    report(&task);
    Ok(())
}

/// Split `KEY:DELAY` into its parts.
fn parse_step(spec: &str) -> Result<(&str, Duration)> {
    let Some((key, delay)) = spec.rsplit_once(':') else {
        return Err(Error::chain_step(spec, "expected KEY:DELAY"));
    };
    if key.trim().is_empty() {
        return Err(Error::chain_step(spec, "missing key"));
    }
    let delay = humantime::parse_duration(delay.trim())
        .map_err(|e| Error::chain_step(spec, e.to_string()))?;
    Ok((key.trim(), delay))
}

/// Build a step that taps the named key after its delay.
fn chain_step(io: &Arc<dyn InputInjector>, spec: &str) -> Result<ChainStep> {
    let (name, delay) = parse_step(spec)?;
    let key = resolve_key(io.as_ref(), name)?;
    let down = key_action(io.clone(), key, true);
    let up = key_action(io.clone(), key, false);
    Ok(ChainStep::new(
        action(move || {
            down();
            up();
        }),
        delay,
    ))
}
