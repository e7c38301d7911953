//! # Gatehouse Core
//!
//! Pure primitives for the Gatehouse authorization engine: identifiers,
//! permissions, roles, principals, effective permission sets, declared
//! requirements, decisions, and signed bearer tokens.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over the RBAC data model.
//!
//! ## Key Types
//!
//! - [`Permission`] - A named capability such as `"manage_amenities"`
//! - [`Role`] - A named bundle of permissions
//! - [`Principal`] - The authenticated actor together with its role refs
//! - [`EffectivePermissions`] - Union of permission names reachable through roles
//! - [`RequirementMap`] - Static `action -> [permission]` table built at startup
//! - [`Decision`] - The allow/deny outcome of a single check
//!
//! ## Model
//!
//! The model is flat: principal → roles → permissions. There is no role
//! inheritance. Tenancy (the society a principal belongs to) is a separate
//! decision dimension, see [`tenant`].

pub mod crypto;
pub mod decision;
pub mod effective;
pub mod error;
pub mod model;
pub mod requirement;
pub mod tenant;
pub mod token;
pub mod types;
pub mod validation;

pub use crypto::{short_digest, Keypair, PublicKey};
pub use decision::{Decision, Denial, DenialKind, ForbiddenReason};
pub use effective::EffectivePermissions;
pub use error::{CoreError, Result};
pub use model::{
    MembershipStatus, NewPermission, NewPrincipal, NewRole, Permission, Principal,
    PrincipalRecord, Role, RoleRef, RoleUpdate,
};
pub use requirement::{Requirement, RequirementMap, RequirementMapBuilder};
pub use tenant::{check_tenant, TenantAccess};
pub use token::{TokenClaims, TokenIssuer, TokenVerifier};
pub use types::{PermissionId, PrincipalId, RoleId, TenantId};
pub use validation::{validate_name, MAX_NAME_LEN};
