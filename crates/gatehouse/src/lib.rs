//! # Gatehouse
//!
//! Dynamic role-based authorization for a multi-tenant residential society
//! backend. Permissions are data, held by roles, held by principals; a
//! single guard checks every action against a static requirement table and
//! the caller's society.
//!
//! ## Overview
//!
//! - **Catalog**: named permissions, created and deleted at runtime
//! - **Roles**: named permission bundles, edited at runtime
//! - **Principals**: users with a society and any number of roles
//! - **Guard**: `action → [permission]` lookup, AND over the caller's
//!   effective set, then the tenant rule
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse::{seed, Gatehouse, GatehouseConfig};
//! use gatehouse::core::{NewPrincipal, PrincipalId, RequirementMap, TenantId};
//! use gatehouse::store::SqliteStore;
//!
//! async fn example() -> gatehouse::Result<()> {
//!     let config = GatehouseConfig::default().with_actions(
//!         RequirementMap::builder()
//!             .action("createAmenity", ["manage_amenities"])
//!             .build(),
//!     );
//!     let gatehouse = Gatehouse::new(SqliteStore::open("gatehouse.db")?, config);
//!     seed::seed(&gatehouse, &seed::default_catalog()).await?;
//!
//!     let society = TenantId::new_v4();
//!     let resident = gatehouse
//!         .register_principal(NewPrincipal::new(PrincipalId::new_v4()).in_tenant(society))
//!         .await?;
//!
//!     let decision = gatehouse
//!         .authorize("createAmenity", Some(&resident), Some(society))
//!         .await?;
//!     assert!(!decision.is_allowed());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `gatehouse::core` - Data model, decisions, tokens
//! - `gatehouse::store` - Storage abstraction and SQLite
//! - `gatehouse::guard` - Resolver, engine, request scope, guard

pub mod config;
pub mod error;
pub mod gatehouse;
pub mod report;
pub mod seed;

pub use gatehouse_core as core;
pub use gatehouse_guard as guard;
pub use gatehouse_store as store;

pub use config::GatehouseConfig;
pub use error::{ErrorKind, GatehouseError, Result};
pub use crate::gatehouse::Gatehouse;
pub use report::permission_report;
pub use seed::{default_catalog, SeedReport};

pub use gatehouse_core::{
    Decision, Denial, EffectivePermissions, ForbiddenReason, Permission, PermissionId, Principal,
    PrincipalId, Role, RoleId, RoleUpdate, TenantId,
};
pub use gatehouse_guard::RequestScope;
pub use gatehouse_store::{AssignResult, RemoveResult};
