//! Error handling for the autokey binary.

use std::result;

use thiserror::Error;

/// Convenient result type for autokey commands.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine construction or settings failure.
    #[error("Engine error: {0}")]
    Engine(#[from] autokey_engine::Error),
    /// A `KEY:DELAY` chain step could not be parsed.
    #[error("Invalid chain step '{step}': {reason}")]
    ChainStep {
        /// The offending argument.
        step: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl Error {
    /// Helper to build a chain step parse error.
    pub fn chain_step(step: &str, reason: impl Into<String>) -> Self {
        Self::ChainStep {
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}
