//! Gatehouse: the administration API and the authorization entry points.
//!
//! Brings together the store, the permission engine, the principal
//! resolver and the guard behind one handle that the dispatch layer and
//! administrative endpoints share.

use std::sync::Arc;

use gatehouse_core::{
    validate_name, Decision, EffectivePermissions, NewPermission, NewPrincipal, NewRole,
    Permission, PermissionId, Principal, PrincipalId, Role, RoleId, RoleUpdate, TenantId,
    TokenVerifier,
};
use gatehouse_guard::{
    AuthorizationGuard, Check, PermissionEngine, PrincipalResolver, RequestScope,
};
use gatehouse_store::{AssignResult, EntityRef, RemoveResult, Store, StoreExt};
use tracing::{debug, info};

use crate::config::GatehouseConfig;
use crate::error::{GatehouseError, Result};

/// The main Gatehouse handle.
///
/// Provides:
/// - Permission catalog administration
/// - Role administration and role ↔ permission links
/// - Principal registration and principal ↔ role links
/// - Effective permission queries
/// - The authorization check, with or without a bearer header
pub struct Gatehouse<S: Store> {
    store: Arc<S>,
    config: GatehouseConfig,
    engine: PermissionEngine<S>,
    guard: AuthorizationGuard<S>,
    resolver: Option<PrincipalResolver<S>>,
}

impl<S: Store> Gatehouse<S> {
    /// Create a new instance over a store.
    pub fn new(store: S, config: GatehouseConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a new instance over a store shared with other components.
    pub fn from_shared(store: Arc<S>, config: GatehouseConfig) -> Self {
        let engine = PermissionEngine::new(store.clone());
        let guard = AuthorizationGuard::new(
            engine.clone(),
            Arc::new(config.actions.clone()),
            config.guard_policy(),
        );
        let resolver = config
            .token_verifier()
            .map(|verifier| PrincipalResolver::new(store.clone(), verifier));
        Self {
            store,
            config,
            engine,
            guard,
            resolver,
        }
    }

    /// Enable bearer token resolution, replacing any configured key.
    pub fn with_token_verifier(mut self, verifier: TokenVerifier) -> Self {
        self.resolver = Some(PrincipalResolver::new(self.store.clone(), verifier));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GatehouseConfig {
        &self.config
    }

    pub fn guard(&self) -> &AuthorizationGuard<S> {
        &self.guard
    }

    pub fn engine(&self) -> &PermissionEngine<S> {
        &self.engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a permission to the catalog.
    pub async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Permission> {
        let name = validate_name("permission name", name)?;
        let new = NewPermission {
            name,
            description: description.map(str::to_string),
        };

        let permission = self.store.insert_permission(&new).await?;
        info!(permission_id = %permission.id, name = %permission.name, "created permission");
        Ok(permission)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.store.list_permissions().await?)
    }

    pub async fn get_permission(&self, id: PermissionId) -> Result<Permission> {
        self.store
            .get_permission(id)
            .await?
            .ok_or(GatehouseError::NotFound(EntityRef::Permission(id)))
    }

    /// Delete a permission; every role loses it.
    pub async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        self.store.delete_permission(id).await?;
        info!(permission_id = %id, "deleted permission");
        Ok(())
    }

    /// Permissions held by a role.
    pub async fn permissions_for_role(&self, role: RoleId) -> Result<Vec<Permission>> {
        Ok(self.get_role(role).await?.permissions)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a role, optionally with initial permissions.
    ///
    /// All-or-nothing: an unknown permission id leaves no role behind.
    pub async fn create_role(&self, name: &str, permissions: &[PermissionId]) -> Result<Role> {
        let name = validate_name("role name", name)?;
        let new = NewRole::new(name).with_permissions(permissions.iter().copied());

        let role = self.store.insert_role(&new).await?;
        info!(
            role_id = %role.id,
            name = %role.name,
            permissions = role.permissions.len(),
            "created role"
        );
        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Role> {
        self.store
            .get_role(id)
            .await?
            .ok_or(GatehouseError::NotFound(EntityRef::Role(id)))
    }

    /// Rename a role and/or replace its permission set.
    pub async fn update_role(&self, id: RoleId, update: RoleUpdate) -> Result<Role> {
        let update = RoleUpdate {
            name: update
                .name
                .map(|n| validate_name("role name", &n))
                .transpose()?,
            permission_ids: update.permission_ids,
        };

        let role = self.store.update_role(id, &update).await?;
        info!(
            role_id = %role.id,
            name = %role.name,
            renamed = update.name.is_some(),
            replaced_permissions = update.permission_ids.is_some(),
            "updated role"
        );
        Ok(role)
    }

    /// Grant a permission to a role. Re-granting is a no-op.
    pub async fn assign_permission_to_role(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(Role, AssignResult)> {
        let result = self.store.add_role_permission(role, permission).await?;
        if result == AssignResult::Assigned {
            info!(role_id = %role, permission_id = %permission, "assigned permission to role");
        }
        Ok((self.get_role(role).await?, result))
    }

    /// Take a permission away from a role. A permission the role lacks is a no-op.
    pub async fn remove_permission_from_role(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<Role> {
        let result = self.store.remove_role_permission(role, permission).await?;
        if result == RemoveResult::Removed {
            info!(role_id = %role, permission_id = %permission, "removed permission from role");
        }
        self.get_role(role).await
    }

    /// Delete a role; every principal loses it.
    pub async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.store.delete_role(id).await?;
        info!(role_id = %id, "deleted role");
        Ok(())
    }

    /// Delete the listed roles that exist. `NotFound` only if none did.
    pub async fn bulk_delete_roles(&self, ids: &[RoleId]) -> Result<usize> {
        let deleted = self.store.delete_roles(ids).await?;
        info!(requested = ids.len(), deleted, "bulk deleted roles");
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Principal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a principal and attach the configured default role if it exists.
    ///
    /// The principal and its default role are written together: if the role
    /// disappears before the write, nothing is registered and a retry is safe.
    pub async fn register_principal(&self, new: NewPrincipal) -> Result<Principal> {
        let mut roles = Vec::new();
        if let Some(default_role) = &self.config.default_role {
            match self.store.find_role_by_name(default_role).await? {
                Some(role) => roles.push(role.id),
                None => debug!(role = %default_role, "default role missing, skipped"),
            }
        }

        let record = self.store.insert_principal_with_roles(&new, &roles).await?;
        info!(
            principal = %record.id,
            tenant = ?record.tenant,
            roles = roles.len(),
            "registered principal"
        );

        self.load_principal(record.id).await
    }

    /// Attach a role to a principal. Re-attaching is a no-op.
    pub async fn assign_role_to_user(
        &self,
        user: PrincipalId,
        role: RoleId,
    ) -> Result<(Principal, AssignResult)> {
        let result = self.store.add_principal_role(user, role).await?;
        if result == AssignResult::Assigned {
            info!(principal = %user, role_id = %role, "assigned role to principal");
        }
        Ok((self.load_principal(user).await?, result))
    }

    /// Detach a role from a principal. A role the principal lacks is a no-op.
    pub async fn unassign_role_from_user(
        &self,
        user: PrincipalId,
        role: RoleId,
    ) -> Result<Principal> {
        let result = self.store.remove_principal_role(user, role).await?;
        if result == RemoveResult::Removed {
            info!(principal = %user, role_id = %role, "unassigned role from principal");
        }
        self.load_principal(user).await
    }

    /// Roles held by a principal, with their permissions.
    pub async fn roles_for_user(&self, user: PrincipalId) -> Result<Vec<Role>> {
        self.store
            .load_roles(user)
            .await?
            .map(|loaded| loaded.roles)
            .ok_or(GatehouseError::NotFound(EntityRef::Principal(user)))
    }

    pub async fn get_principal(&self, user: PrincipalId) -> Result<Principal> {
        self.load_principal(user).await
    }

    async fn load_principal(&self, user: PrincipalId) -> Result<Principal> {
        self.store
            .load_principal(user)
            .await?
            .ok_or(GatehouseError::NotFound(EntityRef::Principal(user)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// The effective permission set of a principal. Empty for unknown principals.
    pub async fn effective_permissions(&self, user: PrincipalId) -> Result<EffectivePermissions> {
        Ok(self.engine.effective_permissions(user).await?)
    }

    /// Decide whether a principal may perform an action.
    pub async fn authorize(
        &self,
        action: &str,
        principal: Option<&Principal>,
        resource_tenant: Option<TenantId>,
    ) -> Result<Decision> {
        Ok(self.guard.check(check(action, principal, resource_tenant)).await?)
    }

    /// [`authorize`](Self::authorize) reusing resolutions within one request.
    pub async fn authorize_scoped(
        &self,
        action: &str,
        principal: Option<&Principal>,
        resource_tenant: Option<TenantId>,
        scope: &RequestScope,
    ) -> Result<Decision> {
        Ok(self
            .guard
            .check_scoped(check(action, principal, resource_tenant), scope)
            .await?)
    }

    /// Decide and convert a denial into `Unauthenticated` / `Forbidden`.
    pub async fn enforce(
        &self,
        action: &str,
        principal: Option<&Principal>,
        resource_tenant: Option<TenantId>,
    ) -> Result<()> {
        self.authorize(action, principal, resource_tenant)
            .await?
            .into_result()
            .map_err(GatehouseError::from)
    }

    /// Resolve a bearer `Authorization` header to a principal.
    pub async fn resolve_bearer(&self, authorization: Option<&str>) -> Result<Option<Principal>> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            GatehouseError::Config("no token verifier configured".to_string())
        })?;
        Ok(resolver.resolve_bearer(authorization).await?)
    }

    /// Resolve the caller from a bearer header, then authorize.
    pub async fn authorize_bearer(
        &self,
        authorization: Option<&str>,
        action: &str,
        resource_tenant: Option<TenantId>,
    ) -> Result<Decision> {
        let principal = self.resolve_bearer(authorization).await?;
        self.authorize(action, principal.as_ref(), resource_tenant)
            .await
    }
}

fn check<'a>(
    action: &'a str,
    principal: Option<&'a Principal>,
    resource_tenant: Option<TenantId>,
) -> Check<'a> {
    Check {
        action,
        principal,
        resource_tenant,
    }
}
