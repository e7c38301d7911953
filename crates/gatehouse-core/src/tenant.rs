//! Tenant scoping.
//!
//! The second authorization dimension: a principal may act on a resource only
//! if the resource belongs to the principal's society, unless the principal
//! holds the configured super role, which bypasses tenant scoping entirely.

use crate::types::TenantId;

/// Outcome of the tenant rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantAccess {
    /// Resource and principal share a tenant.
    SameTenant,
    /// Tenants differ (or the principal has none) but the super role bypasses.
    SuperRoleBypass,
    /// Access denied.
    Mismatch,
}

impl TenantAccess {
    pub fn is_granted(&self) -> bool {
        !matches!(self, TenantAccess::Mismatch)
    }
}

/// Evaluate `resource == principal.tenant OR principal has super_role`.
///
/// A principal without a tenant never matches by tenant.
pub fn check_tenant<'a>(
    principal_tenant: Option<TenantId>,
    principal_roles: impl IntoIterator<Item = &'a str>,
    resource_tenant: TenantId,
    super_role: &str,
) -> TenantAccess {
    if principal_tenant == Some(resource_tenant) {
        return TenantAccess::SameTenant;
    }
    if principal_roles.into_iter().any(|r| r == super_role) {
        return TenantAccess::SuperRoleBypass;
    }
    TenantAccess::Mismatch
}
