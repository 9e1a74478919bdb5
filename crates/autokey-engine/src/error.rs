use std::{io, path::PathBuf, result::Result as StdResult, time::Duration};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the autokey engine.
///
/// Only construction and configuration calls return errors. Faults raised by
/// user actions while a task runs are caught and logged on the worker thread.
#[derive(Debug, Error)]
pub enum Error {
    /// A chained task was built without any steps.
    #[error("chained task '{name}' has no steps")]
    EmptyChain {
        /// Name the task would have had.
        name: String,
    },

    /// A key-driven task was given an empty key name.
    #[error("key name is empty")]
    EmptyKey,

    /// The injector could not resolve a key name.
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    /// Intervals must be strictly positive.
    #[error("invalid interval {0:?}: must be greater than zero")]
    InvalidInterval(Duration),

    /// Executor and registry settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Failed to spawn a worker thread.
    #[error("failed to spawn thread '{name}': {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Settings file could not be read.
    #[error("failed to read settings from {}: {source}", path.display())]
    ReadSettings {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Settings text is not valid RON.
    #[error("failed to parse settings: {0}")]
    ParseSettings(#[from] ron::error::SpannedError),
}

impl Error {
    /// Build a spawn error for the named thread.
    pub(crate) fn spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }
}
