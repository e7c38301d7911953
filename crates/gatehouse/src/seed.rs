//! Default catalog seeding.
//!
//! The society backend ships with a fixed set of permissions and five roles.
//! Seeding is idempotent: existing permissions and roles are reused and
//! existing links are left alone, so it is safe to run on every start.

use gatehouse_core::{validate_name, NewPermission};
use gatehouse_store::{AssignResult, Store, StoreExt};
use tracing::{info, warn};

use crate::error::Result;
use crate::gatehouse::Gatehouse;

/// Which permissions a seeded role receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrants {
    /// Every permission in the catalog.
    All,
    /// The named permissions.
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSeed {
    pub name: String,
    pub grants: RoleGrants,
}

/// Permissions and roles to seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub permissions: Vec<NewPermission>,
    pub roles: Vec<RoleSeed>,
}

impl Catalog {
    pub fn permission(mut self, name: &str, description: &str) -> Self {
        self.permissions
            .push(NewPermission::new(name).with_description(description));
        self
    }

    pub fn role(mut self, name: &str, grants: RoleGrants) -> Self {
        self.roles.push(RoleSeed {
            name: name.to_string(),
            grants,
        });
        self
    }

    /// Permission names a role receives under this catalog.
    pub fn grants_of(&self, role: &str) -> Vec<&str> {
        match self.roles.iter().find(|r| r.name == role).map(|r| &r.grants) {
            Some(RoleGrants::All) => self.permissions.iter().map(|p| p.name.as_str()).collect(),
            Some(RoleGrants::Only(names)) => names.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }
}

fn only(names: &[&str]) -> RoleGrants {
    RoleGrants::Only(names.iter().map(|n| n.to_string()).collect())
}

/// The catalog of the residential society backend.
pub fn default_catalog() -> Catalog {
    Catalog::default()
        .permission("create_society", "Allows creation of new societies")
        .permission("view_societies", "Allows viewing of societies")
        .permission("manage_users", "General user management")
        .permission("create_user", "Allows creating new users (admin/staff)")
        .permission("view_all_users", "Allows viewing all users in society")
        .permission("update_user", "Allows updating user details")
        .permission("delete_user", "Allows deleting users")
        .permission("manage_roles", "Allows management of roles and permissions")
        .permission("manage_flats", "Allows management of flats")
        .permission(
            "manage_amenities",
            "Allows creation, editing, and deletion of amenities and generating slots",
        )
        .permission("view_amenities", "Allows viewing the list of amenities and their slots")
        .permission("control_amenity_slots", "Allows enabling/disabling individual amenity slots")
        .permission("view_all_bookings", "Allows viewing all amenity bookings")
        .permission("manage_society_members", "Allows approving/rejecting new society members")
        .permission(
            "manage_announcements",
            "Full control over announcements (create, edit, delete, publish)",
        )
        .permission("create_announcement_draft", "Allows creating draft announcements only")
        .permission("manage_mc", "Allows adding/removing users from Management Committee")
        .permission("view_all_complaints", "Allows viewing all complaints/service requests")
        .permission("create_complaint", "Allows creating complaints on behalf of residents")
        .permission("assign_complaint", "Allows assigning staff/technicians to complaints")
        .permission("update_complaint_status", "Allows updating the status of complaints")
        .permission("set_complaint_priority", "Allows setting priority levels for complaints")
        .permission(
            "manage_complaint_categories",
            "Allows managing complaint categories/services",
        )
        .permission("create_service", "Allows creating new services/categories")
        .permission("view_services", "Allows viewing services/categories")
        .permission("update_service", "Allows updating services/categories")
        .permission("delete_service", "Allows deleting services/categories")
        .permission("delete_complaint", "Allows deleting complaints permanently")
        .role("SUPERADMIN", RoleGrants::All)
        .role(
            "MANAGER",
            only(&[
                "create_user",
                "delete_user",
                "manage_users",
                "view_all_users",
                "update_user",
                "manage_flats",
                "manage_amenities",
                "view_amenities",
                "control_amenity_slots",
                "view_all_bookings",
                "manage_society_members",
                "manage_announcements",
                "create_announcement_draft",
                "manage_mc",
                "view_all_complaints",
                "create_complaint",
                "assign_complaint",
                "update_complaint_status",
                "set_complaint_priority",
                "create_service",
                "view_services",
                "update_service",
                "delete_service",
                "delete_complaint",
            ]),
        )
        .role(
            "RECEPTIONIST",
            only(&[
                "create_user",
                "view_all_users",
                "view_amenities",
                "control_amenity_slots",
                "view_all_bookings",
                "create_announcement_draft",
                "view_all_complaints",
                "create_complaint",
                "assign_complaint",
                "update_complaint_status",
                "view_services",
            ]),
        )
        .role("USER", only(&[]))
        .role("MC", only(&[]))
}

/// What a seeding run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub permissions_existing: usize,
    pub roles_created: usize,
    pub roles_existing: usize,
    pub links_created: usize,
    pub links_existing: usize,
    /// Role grants naming permissions that are not in the store.
    pub unknown_permissions: Vec<String>,
}

impl SeedReport {
    /// True if the run wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.permissions_created == 0 && self.roles_created == 0 && self.links_created == 0
    }
}

/// Seed a catalog into the store behind `gatehouse`.
pub async fn seed<S: Store>(gatehouse: &Gatehouse<S>, catalog: &Catalog) -> Result<SeedReport> {
    let store = gatehouse.store();
    let mut report = SeedReport::default();

    for permission in &catalog.permissions {
        let new = NewPermission {
            name: validate_name("permission name", &permission.name)?,
            description: permission.description.clone(),
        };
        let (_, created) = store.ensure_permission(&new).await?;
        if created {
            report.permissions_created += 1;
        } else {
            report.permissions_existing += 1;
        }
    }

    let all = store.list_permissions().await?;

    for seed in &catalog.roles {
        let name = validate_name("role name", &seed.name)?;
        let (role, created) = store.ensure_role(&name).await?;
        if created {
            report.roles_created += 1;
        } else {
            report.roles_existing += 1;
        }

        let wanted: Vec<&str> = match &seed.grants {
            RoleGrants::All => all.iter().map(|p| p.name.as_str()).collect(),
            RoleGrants::Only(names) => names.iter().map(String::as_str).collect(),
        };

        for permission_name in wanted {
            let Some(permission) = all.iter().find(|p| p.name == permission_name) else {
                warn!(role = %role.name, permission = permission_name, "seed grant names unknown permission");
                report.unknown_permissions.push(permission_name.to_string());
                continue;
            };
            match store.add_role_permission(role.id, permission.id).await? {
                AssignResult::Assigned => report.links_created += 1,
                AssignResult::AlreadyAssigned => report.links_existing += 1,
            }
        }
    }

    info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        links_created = report.links_created,
        "seeded catalog"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatehouseConfig;
    use gatehouse_store::MemoryStore;

    #[test]
    fn test_default_catalog_shape() {
        let catalog = default_catalog();
        assert_eq!(catalog.permissions.len(), 28);
        assert_eq!(
            catalog.roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["SUPERADMIN", "MANAGER", "RECEPTIONIST", "USER", "MC"]
        );
        assert_eq!(catalog.grants_of("SUPERADMIN").len(), 28);
        assert_eq!(catalog.grants_of("MANAGER").len(), 24);
        assert_eq!(catalog.grants_of("RECEPTIONIST").len(), 11);
        assert!(catalog.grants_of("USER").is_empty());
        assert!(!catalog.grants_of("MANAGER").contains(&"manage_roles"));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let gatehouse = Gatehouse::new(MemoryStore::new(), GatehouseConfig::default());
        let catalog = default_catalog();

        let first = seed(&gatehouse, &catalog).await.unwrap();
        assert_eq!(first.permissions_created, 28);
        assert_eq!(first.roles_created, 5);
        assert_eq!(first.links_created, 28 + 24 + 11);
        assert!(first.unknown_permissions.is_empty());

        let second = seed(&gatehouse, &catalog).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(second.links_existing, first.links_created);
    }

    #[tokio::test]
    async fn test_unknown_grant_is_reported() {
        let gatehouse = Gatehouse::new(MemoryStore::new(), GatehouseConfig::default());
        let catalog = Catalog::default()
            .permission("view_amenities", "view")
            .role("USER", only(&["view_amenities", "fly"]));

        let report = seed(&gatehouse, &catalog).await.unwrap();
        assert_eq!(report.unknown_permissions, vec!["fly".to_string()]);
        assert_eq!(report.links_created, 1);
    }
}
