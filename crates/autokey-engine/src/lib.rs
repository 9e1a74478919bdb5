//! Autokey Engine
//!
//! Background input automation built on plain OS threads:
//! - [`PeriodicTask`]: press/hold/release on a fixed interval, with the
//!   clicker, key presser and runner flavours in [`presets`]
//! - [`ChainedTask`]: an ordered list of delayed actions, optionally looping
//! - [`BoundedExecutor`]: a fixed worker pool with a capacity limit and a
//!   watchdog that reports, but never cancels, overrunning jobs
//! - [`AutomationRegistry`]: named ownership of live tasks
//!
//! Every task stops synchronously: once [`Task::stop`] returns, the worker
//! has exited and the final release has been issued.

mod action;
mod chained;
mod error;
mod executor;
mod periodic;
pub mod presets;
mod registry;
mod settings;
mod signal;
mod task;
pub mod test_support;

pub use action::{Action, action, noop};
pub use chained::{ChainStep, ChainedTask, CompletionCallback};
pub use error::{Error, Result};
pub use executor::{
    BoundedExecutor, ExecutorObserver, ExecutorStats, JobHandle, Rejected, STOP_POLL_INTERVAL_MS,
};
pub use periodic::{Cadence, HOLD_DURATION_MS, PeriodicBuilder, PeriodicTask};
pub use registry::{AutomationRegistry, PeriodicKind, next_task_name};
pub use settings::{ExecutorSettings, PeriodicSettings, Settings};
pub use task::{Task, TaskHandle};
