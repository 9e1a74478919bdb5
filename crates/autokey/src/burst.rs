//! `autokey burst`: exercise the bounded executor's backpressure and watchdog.

use std::{sync::Arc, thread, time::Duration};

use autokey_engine::{BoundedExecutor, ExecutorObserver, Rejected, Settings};
use tracing::{info, warn};

use crate::{cli::BurstArgs, error::Result};

/// Logs watchdog reports as they arrive.
struct LogObserver;

impl ExecutorObserver for LogObserver {
    fn on_timeout(&self, job: u64, budget: Duration) {
        warn!(job, ?budget, "overrun_reported");
    }

    fn on_fault(&self, job: u64, message: &str) {
        warn!(job, message, "fault_reported");
    }
}

/// Submit `args.jobs` sleeping jobs as fast as possible, wait for the accepted
/// ones, and print the executor counters.
pub fn run(settings: &Settings, args: &BurstArgs) -> Result<()> {
    let exec = BoundedExecutor::from_settings(&settings.executor)?;
    exec.set_observer(Arc::new(LogObserver));
    let timeout =
        args.timeout.unwrap_or(Duration::from_millis(settings.executor.default_timeout_ms));

    let mut accepted = Vec::new();
    let mut full = 0usize;
    for _ in 0..args.jobs {
        let work = args.work;
        match exec.submit(move || thread::sleep(work), timeout) {
            Ok(handle) => accepted.push(handle),
            Err(Rejected::QueueFull) => full += 1,
            Err(Rejected::ShuttingDown) => break,
        }
    }
    info!(accepted = accepted.len(), rejected = full, "burst_submitted");

    let wait = args
        .work
        .saturating_mul(u32::try_from(args.jobs).unwrap_or(u32::MAX))
        .max(Duration::from_secs(1));
    for handle in &accepted {
        if !handle.wait(wait) {
            warn!(job = handle.id(), "job_still_running");
        }
    }
    let joined = exec.shutdown(Duration::from_millis(settings.executor.shutdown_deadline_ms));

    let stats = exec.stats();
    println!(
        "submitted={} rejected={} completed={} timed_out={} faulted={} peak={} clean_shutdown={}",
        stats.submitted,
        stats.rejected,
        stats.completed,
        stats.timed_out,
        stats.faulted,
        stats.peak_outstanding,
        joined
    );
    Ok(())
}
