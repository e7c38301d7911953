//! # Gatehouse Store
//!
//! Storage abstraction for Gatehouse. Provides a trait-based interface for
//! the permission catalog, roles and principal role assignments, with SQLite
//! and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AssignResult`] / [`RemoveResult`] - Outcome of idempotent link operations
//! - [`LoadedRoles`] - A principal with its roles, read atomically
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse_core::{NewPermission, NewRole};
//! use gatehouse_store::{SqliteStore, Store};
//!
//! async fn example() -> gatehouse_store::Result<()> {
//!     let store = SqliteStore::open("gatehouse.db")?;
//!
//!     let view = store.insert_permission(&NewPermission::new("view_amenities")).await?;
//!     let role = store
//!         .insert_role(&NewRole::new("USER").with_permissions([view.id]))
//!         .await?;
//!     assert!(role.grants("view_amenities"));
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic mutations**: each call validates every reference before writing
//! - **Idempotent links**: re-linking returns `AlreadyAssigned`
//! - **Cascading deletes**: permissions leave roles, roles leave principals
//! - **Revision counter**: bumped on every change, read by per-request caches

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{EntityRef, Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AssignResult, LoadedRoles, RemoveResult, Store, StoreExt};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
