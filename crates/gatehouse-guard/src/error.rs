//! Error types for the guard module.

use gatehouse_core::{CoreError, Denial};
use gatehouse_store::StoreError;
use thiserror::Error;

/// Errors that can occur while resolving principals or checking actions.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The check completed and denied the action.
    #[error(transparent)]
    Denied(#[from] Denial),

    /// The store could not be read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl GuardError {
    /// The denial, if this error is one.
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            GuardError::Denied(denial) => Some(denial),
            _ => None,
        }
    }
}

/// Result type for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
