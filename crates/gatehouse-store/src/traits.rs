//! Store trait: the abstract interface for RBAC persistence.
//!
//! One trait covers the permission catalog, roles with their permission
//! sets, and the principal ↔ role relation. Implementations include SQLite
//! (primary) and in-memory (for tests).

use std::future::Future;

use async_trait::async_trait;
use gatehouse_core::{
    NewPermission, NewPrincipal, NewRole, Permission, PermissionId, Principal, PrincipalId,
    PrincipalRecord, Role, RoleId, RoleUpdate,
};

use crate::error::Result;

/// Result of linking two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignResult {
    /// The link was created.
    Assigned,
    /// The link already existed (idempotent - not an error).
    AlreadyAssigned,
}

/// Result of unlinking two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveResult {
    /// The link was removed.
    Removed,
    /// There was no such link (no-op).
    NotAssigned,
}

/// A principal's stored record together with its roles, read atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRoles {
    pub record: PrincipalRecord,
    /// Roles with their permissions eagerly loaded, ordered by role id.
    pub roles: Vec<Role>,
}

impl LoadedRoles {
    pub fn into_principal(self) -> Principal {
        Principal::from_record(self.record, &self.roles)
    }
}

/// The Store trait: async interface for RBAC persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic mutations**: every mutating call validates all references
///   first and applies nothing when one is missing.
/// - **Idempotent links**: linking twice returns `AlreadyAssigned`.
/// - **Cascades**: deleting a permission removes it from every role;
///   deleting a role removes it from every principal.
/// - **Revision**: every successful mutation increments [`Store::revision`].
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a permission. `Conflict` if the name is taken.
    async fn insert_permission(&self, new: &NewPermission) -> Result<Permission>;

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>>;

    /// All permissions ordered by id.
    async fn list_permissions(&self) -> Result<Vec<Permission>>;

    /// Delete a permission and unlink it from every role. `NotFound` if absent.
    async fn delete_permission(&self, id: PermissionId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Role Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a role with its initial permissions.
    ///
    /// `NotFound` naming the first unknown permission id, `Conflict` on a
    /// taken name. Nothing is written on error.
    async fn insert_role(&self, new: &NewRole) -> Result<Role>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// All roles with their permissions, ordered by id.
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Rename and/or replace the permission set of a role atomically.
    async fn update_role(&self, id: RoleId, update: &RoleUpdate) -> Result<Role>;

    /// Link a permission to a role. `NotFound` if either is missing.
    async fn add_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<AssignResult>;

    /// Unlink a permission from a role. `NotFound` only if the role is missing.
    async fn remove_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<RemoveResult>;

    /// Delete a role and unlink it from every principal. `NotFound` if absent.
    async fn delete_role(&self, id: RoleId) -> Result<()>;

    /// Delete every listed role that exists; returns how many were deleted.
    ///
    /// `NotFound` only if none of the ids matched.
    async fn delete_roles(&self, ids: &[RoleId]) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Principal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a principal with no roles.
    async fn insert_principal(&self, new: &NewPrincipal) -> Result<PrincipalRecord>;

    /// Register a principal together with its initial roles in one write.
    ///
    /// `DuplicatePrincipal` if the id is taken, `NotFound` if any role is
    /// missing. On error nothing is written.
    async fn insert_principal_with_roles(
        &self,
        new: &NewPrincipal,
        roles: &[RoleId],
    ) -> Result<PrincipalRecord>;

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>>;

    /// Read a principal and its roles (with permissions) in one consistent read.
    ///
    /// `None` if the principal does not exist.
    async fn load_roles(&self, id: PrincipalId) -> Result<Option<LoadedRoles>>;

    /// Attach a role to a principal. `NotFound` if either is missing.
    async fn add_principal_role(&self, principal: PrincipalId, role: RoleId)
        -> Result<AssignResult>;

    /// Detach a role from a principal. `NotFound` only if the principal is missing.
    async fn remove_principal_role(
        &self,
        principal: PrincipalId,
        role: RoleId,
    ) -> Result<RemoveResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Revision
    // ─────────────────────────────────────────────────────────────────────────

    /// Monotonic counter incremented by every successful mutation.
    async fn revision(&self) -> Result<u64>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Load a principal with its role refs, or `None` if unknown.
    fn load_principal(
        &self,
        id: PrincipalId,
    ) -> impl Future<Output = Result<Option<Principal>>> + Send;

    /// Get a permission by name, inserting it if missing.
    ///
    /// Returns the permission and whether it was created.
    fn ensure_permission(
        &self,
        new: &NewPermission,
    ) -> impl Future<Output = Result<(Permission, bool)>> + Send;

    /// Get a role by name, inserting an empty one if missing.
    fn ensure_role(&self, name: &str) -> impl Future<Output = Result<(Role, bool)>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn load_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.load_roles(id).await?.map(LoadedRoles::into_principal))
    }

    async fn ensure_permission(&self, new: &NewPermission) -> Result<(Permission, bool)> {
        if let Some(existing) = self.find_permission_by_name(&new.name).await? {
            return Ok((existing, false));
        }
        Ok((self.insert_permission(new).await?, true))
    }

    async fn ensure_role(&self, name: &str) -> Result<(Role, bool)> {
        if let Some(existing) = self.find_role_by_name(name).await? {
            return Ok((existing, false));
        }
        Ok((self.insert_role(&NewRole::new(name)).await?, true))
    }
}
