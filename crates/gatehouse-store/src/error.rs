//! Error types for the store module.

use std::fmt;

use gatehouse_core::{PermissionId, PrincipalId, RoleId};
use thiserror::Error;

/// The entity a `NotFound` error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Permission(PermissionId),
    Role(RoleId),
    Principal(PrincipalId),
    /// A batch of roles of which none matched.
    Roles(Vec<RoleId>),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Permission(id) => write!(f, "permission {}", id),
            EntityRef::Role(id) => write!(f, "role {}", id),
            EntityRef::Principal(id) => write!(f, "principal {}", id),
            EntityRef::Roles(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "roles [{}]", ids.join(", "))
            }
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(EntityRef),

    /// A unique name is already taken.
    #[error("{entity} named {name:?} already exists")]
    Conflict { entity: &'static str, name: String },

    /// A principal with this id is already registered.
    #[error("principal {0} already exists")]
    DuplicatePrincipal(PrincipalId),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// The blocking task running a database operation failed.
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::DuplicatePrincipal(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
