//! Error types for the Gatehouse facade.

use gatehouse_core::{CoreError, Denial, ForbiddenReason};
use gatehouse_guard::GuardError;
use gatehouse_store::{EntityRef, StoreError};
use thiserror::Error;

/// Errors returned by [`crate::Gatehouse`].
#[derive(Debug, Error)]
pub enum GatehouseError {
    /// A referenced permission, role or principal does not exist.
    #[error("{0} not found")]
    NotFound(EntityRef),

    /// A unique name or id is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rejected input.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// No principal could be established.
    #[error("not authenticated")]
    Unauthenticated,

    /// The principal may not perform the action.
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Bad or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Transport-neutral error category for the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthenticated,
    Forbidden,
    Invalid,
    Internal,
}

impl GatehouseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatehouseError::NotFound(_) => ErrorKind::NotFound,
            GatehouseError::Conflict(_) => ErrorKind::Conflict,
            GatehouseError::Invalid(_) => ErrorKind::Invalid,
            GatehouseError::Unauthenticated => ErrorKind::Unauthenticated,
            GatehouseError::Forbidden(_) => ErrorKind::Forbidden,
            GatehouseError::Store(_) | GatehouseError::Core(_) | GatehouseError::Config(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<StoreError> for GatehouseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => GatehouseError::NotFound(entity),
            StoreError::Conflict { .. } | StoreError::DuplicatePrincipal(_) => {
                GatehouseError::Conflict(err.to_string())
            }
            other => GatehouseError::Store(other),
        }
    }
}

impl From<CoreError> for GatehouseError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput { .. } => GatehouseError::Invalid(err.to_string()),
            other => GatehouseError::Core(other),
        }
    }
}

impl From<Denial> for GatehouseError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => GatehouseError::Unauthenticated,
            Denial::Forbidden(reason) => GatehouseError::Forbidden(reason),
        }
    }
}

impl From<GuardError> for GatehouseError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Denied(denial) => denial.into(),
            GuardError::Store(e) => e.into(),
            GuardError::Core(e) => e.into(),
        }
    }
}

/// Result type for Gatehouse operations.
pub type Result<T> = std::result::Result<T, GatehouseError>;
