//! Permission resolution.
//!
//! Computes the effective permission set of a principal: load its roles
//! (with permissions) in one store read, then take the union of permission
//! names. Nothing is cached here; see [`crate::RequestScope`] for the
//! per-request memo.

use std::sync::Arc;

use gatehouse_core::{EffectivePermissions, PrincipalId, Role, RoleRef};
use gatehouse_store::Store;
use tracing::trace;

use crate::error::Result;

/// The resolved authorization view of one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub principal: PrincipalId,
    /// Whether the principal exists in the store.
    pub known: bool,
    pub roles: Vec<RoleRef>,
    pub permissions: EffectivePermissions,
    /// Store revision observed before the read.
    pub revision: u64,
}

impl Resolution {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.name.as_str())
    }
}

/// Resolves principals to their effective permissions.
pub struct PermissionEngine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for PermissionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> PermissionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The roles a principal holds, permissions loaded. Empty if unknown.
    pub async fn load_roles(&self, principal: PrincipalId) -> Result<Vec<Role>> {
        Ok(self
            .store
            .load_roles(principal)
            .await?
            .map(|loaded| loaded.roles)
            .unwrap_or_default())
    }

    /// Union of permission names over the principal's roles.
    ///
    /// Unknown principals and principals without roles get the empty set.
    pub async fn effective_permissions(
        &self,
        principal: PrincipalId,
    ) -> Result<EffectivePermissions> {
        Ok(self.resolve(principal).await?.permissions)
    }

    /// Resolve roles and effective permissions together.
    pub async fn resolve(&self, principal: PrincipalId) -> Result<Resolution> {
        let revision = self.store.revision().await?;
        let loaded = self.store.load_roles(principal).await?;

        let (known, roles) = match loaded {
            Some(loaded) => (true, loaded.roles),
            None => (false, Vec::new()),
        };
        let permissions = EffectivePermissions::from_roles(&roles);
        trace!(
            %principal,
            roles = roles.len(),
            permissions = permissions.len(),
            "resolved effective permissions"
        );

        Ok(Resolution {
            principal,
            known,
            roles: roles.iter().map(Role::to_ref).collect(),
            permissions,
            revision,
        })
    }
}
