//! Plain-text report of roles and the permission catalog.

use gatehouse_core::{Permission, Role};
use gatehouse_store::Store;

use crate::error::Result;
use crate::gatehouse::Gatehouse;

/// Render every role with its permissions, then the whole catalog.
pub async fn permission_report<S: Store>(gatehouse: &Gatehouse<S>) -> Result<String> {
    let roles = gatehouse.list_roles().await?;
    let permissions = gatehouse.list_permissions().await?;
    Ok(render(&roles, &permissions))
}

/// Format a report from already loaded roles and permissions.
pub fn render(roles: &[Role], permissions: &[Permission]) -> String {
    let mut out = String::from("--- Current Roles and Permissions ---\n");

    for role in roles {
        let names: Vec<&str> = role.permission_names().collect();
        let listed = if names.is_empty() {
            "No permissions".to_string()
        } else {
            names.join(", ")
        };
        out.push_str(&format!("Role: {} [{}]\n", role.name, listed));
    }

    out.push_str("\n--- All Available Permissions ---\n");
    for permission in permissions {
        out.push_str(&format!("- {}\n", permission.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{PermissionId, RoleId};

    fn perm(id: i64, name: &str) -> Permission {
        Permission {
            id: PermissionId(id),
            name: name.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_render() {
        let view = perm(1, "view_amenities");
        let manage = perm(2, "manage_amenities");
        let roles = vec![
            Role::new(RoleId(1), "MANAGER", vec![manage.clone(), view.clone()]),
            Role::new(RoleId(2), "USER", vec![]),
        ];

        let report = render(&roles, &[view, manage]);
        assert_eq!(
            report,
            "--- Current Roles and Permissions ---\n\
             Role: MANAGER [view_amenities, manage_amenities]\n\
             Role: USER [No permissions]\n\
             \n\
             --- All Available Permissions ---\n\
             - view_amenities\n\
             - manage_amenities\n"
        );
    }
}
