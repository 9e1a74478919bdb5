use std::result::Result as StdResult;

use thiserror::Error;

/// Result type for injector operations.
pub type Result<T> = StdResult<T, Error>;

/// Errors reported by an [`InputInjector`](crate::InputInjector).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The named mouse button is not recognised.
    #[error("unknown mouse button '{0}'")]
    UnknownButton(String),

    /// The named button action is not recognised.
    #[error("unknown button action '{0}'")]
    UnknownAction(String),

    /// The display connection or input device is unavailable.
    #[error("input device unavailable: {0}")]
    Unavailable(String),

    /// The backend refused or failed to deliver the event.
    #[error("failed to inject event: {0}")]
    Inject(String),
}
