//! # Gatehouse Guard
//!
//! Request-time authorization: who is calling, what can they do, and may
//! they do this.
//!
//! ## Key Types
//!
//! - [`PrincipalResolver`] - Bearer token to [`gatehouse_core::Principal`]
//! - [`PermissionEngine`] - Principal to effective permission set
//! - [`RequestScope`] - Optional per-request memo, invalidated by store revision
//! - [`AuthorizationGuard`] - The single generic check run before every action
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gatehouse_core::RequirementMap;
//! use gatehouse_guard::{AuthorizationGuard, Check, GuardPolicy, PermissionEngine};
//! use gatehouse_store::MemoryStore;
//!
//! async fn example(principal: Option<&gatehouse_core::Principal>) -> gatehouse_guard::Result<()> {
//!     let requirements = RequirementMap::builder()
//!         .action("createAmenity", ["manage_amenities"])
//!         .build();
//!     let guard = AuthorizationGuard::new(
//!         PermissionEngine::new(Arc::new(MemoryStore::new())),
//!         Arc::new(requirements),
//!         GuardPolicy::default(),
//!     );
//!
//!     guard.enforce(Check::new("createAmenity", principal)).await
//! }
//! ```

pub mod engine;
pub mod error;
pub mod guard;
pub mod resolver;
pub mod scope;

pub use engine::{PermissionEngine, Resolution};
pub use error::{GuardError, Result};
pub use guard::{AuthorizationGuard, Check, GuardPolicy, DEFAULT_SUPER_ROLE};
pub use resolver::{bearer_token, PrincipalResolver};
pub use scope::RequestScope;
