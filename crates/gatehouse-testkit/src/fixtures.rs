//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Everything is addressed by name
//! so tests read like the role matrix they set up.

use gatehouse::core::{NewPermission, NewPrincipal, RequirementMap};
use gatehouse::store::{MemoryStore, SqliteStore, Store, StoreExt};
use gatehouse::{
    Decision, Gatehouse, GatehouseConfig, Permission, Principal, PrincipalId, Result, Role,
    TenantId,
};

/// A Gatehouse with a fixed society for the principals it registers.
pub struct Fixture<S: Store> {
    pub gatehouse: Gatehouse<S>,
    pub society: TenantId,
}

/// Configuration without a default role, so principals hold exactly the
/// roles a test gives them.
pub fn config(actions: RequirementMap) -> GatehouseConfig {
    GatehouseConfig {
        default_role: None,
        ..GatehouseConfig::default()
    }
    .with_actions(actions)
}

impl Fixture<MemoryStore> {
    pub fn memory(actions: RequirementMap) -> Self {
        Self::new(MemoryStore::new(), actions)
    }
}

impl Fixture<SqliteStore> {
    /// In-memory SQLite database.
    pub fn sqlite(actions: RequirementMap) -> Result<Self> {
        Ok(Self::new(SqliteStore::open_memory()?, actions))
    }
}

impl<S: Store> Fixture<S> {
    pub fn new(store: S, actions: RequirementMap) -> Self {
        Self {
            gatehouse: Gatehouse::new(store, config(actions)),
            society: TenantId::new_v4(),
        }
    }

    pub fn store(&self) -> &S {
        self.gatehouse.store()
    }

    /// Get or create a permission by name.
    pub async fn permission(&self, name: &str) -> Result<Permission> {
        let (permission, _) = self
            .store()
            .ensure_permission(&NewPermission::new(name))
            .await?;
        Ok(permission)
    }

    /// Create a role holding the named permissions, creating them as needed.
    pub async fn role(&self, name: &str, permissions: &[&str]) -> Result<Role> {
        let mut ids = Vec::with_capacity(permissions.len());
        for permission in permissions {
            ids.push(self.permission(permission).await?.id);
        }
        self.gatehouse.create_role(name, &ids).await
    }

    /// Register a principal in the fixture's society holding the named roles.
    ///
    /// Missing roles are created empty.
    pub async fn principal(&self, roles: &[&str]) -> Result<Principal> {
        let new = NewPrincipal::new(PrincipalId::new_v4()).in_tenant(self.society);
        self.principal_from(new, roles).await
    }

    /// Register a principal without a society.
    pub async fn principal_without_society(&self, roles: &[&str]) -> Result<Principal> {
        self.principal_from(NewPrincipal::new(PrincipalId::new_v4()), roles)
            .await
    }

    async fn principal_from(&self, new: NewPrincipal, roles: &[&str]) -> Result<Principal> {
        let mut principal = self.gatehouse.register_principal(new).await?;
        for name in roles {
            let (role, _) = self.store().ensure_role(name).await?;
            principal = self.gatehouse.assign_role_to_user(principal.id, role.id).await?.0;
        }
        Ok(principal)
    }

    /// Look up a role by name.
    pub async fn role_named(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.store().find_role_by_name(name).await?)
    }

    /// Authorize within the fixture's society.
    pub async fn authorize(&self, action: &str, principal: Option<&Principal>) -> Result<Decision> {
        self.gatehouse
            .authorize(action, principal, Some(self.society))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_builds_role_matrix() {
        let fixture = Fixture::memory(
            RequirementMap::builder()
                .action("listAmenities", ["view_amenities"])
                .build(),
        );
        fixture.role("RECEPTIONIST", &["view_amenities"]).await.unwrap();
        let principal = fixture.principal(&["RECEPTIONIST", "MC"]).await.unwrap();

        assert_eq!(principal.tenant, Some(fixture.society));
        assert!(principal.has_role("RECEPTIONIST"));
        assert!(principal.has_role("MC"));
        assert!(fixture.role_named("MC").await.unwrap().is_some());
        assert!(fixture
            .authorize("listAmenities", Some(&principal))
            .await
            .unwrap()
            .is_allowed());
    }

    #[tokio::test]
    async fn test_permission_is_reused() {
        let fixture = Fixture::sqlite(RequirementMap::new()).unwrap();
        let first = fixture.permission("manage_flats").await.unwrap();
        let second = fixture.permission("manage_flats").await.unwrap();
        assert_eq!(first, second);
    }
}
