//! Harness errors.

use thiserror::Error;
use trackcast_core::ViewError;
use trackcast_env::EnvError;

#[derive(Debug, Error)]
pub enum SimError {
    /// A scenario expectation did not hold
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }
}

/// Fails with `SimError::Assertion` unless `cond` holds.
pub fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), SimError> {
    if cond {
        Ok(())
    } else {
        Err(SimError::Assertion(msg()))
    }
}
