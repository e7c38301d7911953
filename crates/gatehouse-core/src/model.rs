//! The RBAC data model: permissions, roles, and principals.
//!
//! The model is flat. A principal holds zero or more roles, a role holds zero
//! or more permissions, and nothing else grants capabilities.

use serde::{Deserialize, Serialize};

use crate::types::{PermissionId, PrincipalId, RoleId, TenantId};

/// A named capability such as `"manage_amenities"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Store-assigned identifier.
    pub id: PermissionId,
    /// Canonical capability name. Globally unique, immutable.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
}

/// A named, reusable bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Store-assigned identifier.
    pub id: RoleId,
    /// Unique role name, e.g. `"MANAGER"`.
    pub name: String,
    /// Permissions granted by this role, sorted by id, no duplicates.
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Create a role, normalizing the permission list (sorted by id, deduplicated).
    pub fn new(id: RoleId, name: impl Into<String>, mut permissions: Vec<Permission>) -> Self {
        permissions.sort_by_key(|p| p.id);
        permissions.dedup_by_key(|p| p.id);
        Self {
            id,
            name: name.into(),
            permissions,
        }
    }

    /// Ids of the permissions held by this role.
    pub fn permission_ids(&self) -> Vec<PermissionId> {
        self.permissions.iter().map(|p| p.id).collect()
    }

    /// Names of the permissions held by this role.
    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.name.as_str())
    }

    /// Check whether this role grants the named permission.
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p.name == permission)
    }

    /// A lightweight reference to this role.
    pub fn to_ref(&self) -> RoleRef {
        RoleRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Reference to a role held by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

/// Membership status of a principal in its society.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    /// Stable textual form used for persistence.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "PENDING",
            MembershipStatus::Approved => "APPROVED",
            MembershipStatus::Rejected => "REJECTED",
        }
    }

    /// Parse the persisted textual form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(MembershipStatus::Pending),
            "APPROVED" => Some(MembershipStatus::Approved),
            "REJECTED" => Some(MembershipStatus::Rejected),
            _ => None,
        }
    }
}

/// A stored principal without its roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: PrincipalId,
    /// The society this principal belongs to, if any.
    pub tenant: Option<TenantId>,
    pub status: Option<MembershipStatus>,
}

/// The authenticated actor on whose behalf an action is authorized.
///
/// Produced by the principal resolver with roles loaded explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub tenant: Option<TenantId>,
    pub status: Option<MembershipStatus>,
    pub roles: Vec<RoleRef>,
}

impl Principal {
    /// Combine a stored record with its loaded roles.
    pub fn from_record(record: PrincipalRecord, roles: &[Role]) -> Self {
        Self {
            id: record.id,
            tenant: record.tenant,
            status: record.status,
            roles: roles.iter().map(Role::to_ref).collect(),
        }
    }

    /// Check whether the principal holds a role with the given name.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// Names of the roles held by this principal.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.name.as_str())
    }

    /// The stored record part of this principal.
    pub fn record(&self) -> PrincipalRecord {
        PrincipalRecord {
            id: self.id,
            tenant: self.tenant,
            status: self.status,
        }
    }
}

/// Input for creating a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPermission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    /// Permissions to attach on creation. Every id must exist.
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permission_ids: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, ids: impl IntoIterator<Item = PermissionId>) -> Self {
        self.permission_ids.extend(ids);
        self
    }
}

/// Partial update of a role.
///
/// `permission_ids`, when present, replaces the whole permission set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permission_ids: Option<Vec<PermissionId>>,
}

impl RoleUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            permission_ids: None,
        }
    }

    pub fn replace_permissions(ids: impl IntoIterator<Item = PermissionId>) -> Self {
        Self {
            name: None,
            permission_ids: Some(ids.into_iter().collect()),
        }
    }

    /// True if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.permission_ids.is_none()
    }
}

/// Input for registering a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrincipal {
    pub id: PrincipalId,
    #[serde(default)]
    pub tenant: Option<TenantId>,
    #[serde(default)]
    pub status: Option<MembershipStatus>,
}

impl NewPrincipal {
    pub fn new(id: PrincipalId) -> Self {
        Self {
            id,
            tenant: None,
            status: None,
        }
    }

    pub fn in_tenant(mut self, tenant: TenantId) -> Self {
        self.tenant = Some(tenant);
        self
    }

    pub fn with_status(mut self, status: MembershipStatus) -> Self {
        self.status = Some(status);
        self
    }
}
