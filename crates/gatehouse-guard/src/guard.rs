//! The authorization guard.
//!
//! One generic check runs before every protected action. The requirement
//! is looked up in the static [`RequirementMap`], the principal's effective
//! permissions are resolved, and the tenant dimension is applied last.
//!
//! Evaluation order:
//!
//! 1. no principal → `Unauthenticated`, whatever the action
//! 2. unregistered action → empty requirement, or `UnregisteredAction` when
//!    the policy denies unregistered actions
//! 3. empty requirement without a resource tenant → `Allowed`, no lookup
//! 4. every required permission must be in the effective set
//! 5. resource tenant must equal the principal's, unless it holds the super role

use std::sync::Arc;

use gatehouse_core::{
    check_tenant, Decision, Denial, ForbiddenReason, Principal, Requirement, RequirementMap,
    TenantAccess, TenantId,
};
use gatehouse_store::Store;

use crate::engine::{PermissionEngine, Resolution};
use crate::error::{GuardError, Result};
use crate::scope::RequestScope;

/// Default name of the role that bypasses tenant scoping.
pub const DEFAULT_SUPER_ROLE: &str = "SUPERADMIN";

/// Policy knobs for the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Role whose holders may act on any tenant's resources.
    pub super_role: String,
    /// Deny actions missing from the requirement map instead of treating
    /// them as open.
    pub deny_unregistered_actions: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            super_role: DEFAULT_SUPER_ROLE.to_string(),
            deny_unregistered_actions: false,
        }
    }
}

/// A single authorization question.
#[derive(Debug, Clone, Copy)]
pub struct Check<'a> {
    pub action: &'a str,
    pub principal: Option<&'a Principal>,
    /// Society owning the target resource, when the action is tenant scoped.
    pub resource_tenant: Option<TenantId>,
}

impl<'a> Check<'a> {
    pub fn new(action: &'a str, principal: Option<&'a Principal>) -> Self {
        Self {
            action,
            principal,
            resource_tenant: None,
        }
    }

    pub fn in_tenant(mut self, tenant: TenantId) -> Self {
        self.resource_tenant = Some(tenant);
        self
    }
}

/// Decides whether a principal may perform an action.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct AuthorizationGuard<S: Store> {
    engine: PermissionEngine<S>,
    requirements: Arc<RequirementMap>,
    policy: GuardPolicy,
}

impl<S: Store> AuthorizationGuard<S> {
    pub fn new(
        engine: PermissionEngine<S>,
        requirements: Arc<RequirementMap>,
        policy: GuardPolicy,
    ) -> Self {
        Self {
            engine,
            requirements,
            policy,
        }
    }

    pub fn requirements(&self) -> &RequirementMap {
        &self.requirements
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    pub fn engine(&self) -> &PermissionEngine<S> {
        &self.engine
    }

    /// Decide a check, resolving permissions fresh from the store.
    pub async fn check(&self, check: Check<'_>) -> Result<Decision> {
        self.decide(check, None).await
    }

    /// Decide a check, reusing resolutions cached in the request scope.
    pub async fn check_scoped(&self, check: Check<'_>, scope: &RequestScope) -> Result<Decision> {
        self.decide(check, Some(scope)).await
    }

    /// Like [`check`](Self::check) but turns a denial into an error.
    pub async fn enforce(&self, check: Check<'_>) -> Result<()> {
        self.check(check)
            .await?
            .into_result()
            .map_err(GuardError::Denied)
    }

    /// Like [`check_scoped`](Self::check_scoped) but turns a denial into an error.
    pub async fn enforce_scoped(&self, check: Check<'_>, scope: &RequestScope) -> Result<()> {
        self.check_scoped(check, scope)
            .await?
            .into_result()
            .map_err(GuardError::Denied)
    }

    async fn decide(&self, check: Check<'_>, scope: Option<&RequestScope>) -> Result<Decision> {
        let Some(principal) = check.principal else {
            return Ok(Decision::Denied(Denial::Unauthenticated));
        };

        let requirement = match self.requirement(check.action) {
            Ok(requirement) => requirement,
            Err(reason) => return Ok(Decision::Denied(Denial::Forbidden(reason))),
        };

        if requirement.is_empty() && check.resource_tenant.is_none() {
            return Ok(Decision::Allowed);
        }

        let resolution = self.resolve(principal, scope).await?;

        let missing = resolution.permissions.missing(requirement.permissions());
        if !missing.is_empty() {
            return Ok(Decision::Denied(Denial::Forbidden(
                ForbiddenReason::MissingPermissions(missing),
            )));
        }

        if let Some(resource) = check.resource_tenant {
            let access = check_tenant(
                principal.tenant,
                resolution.role_names(),
                resource,
                &self.policy.super_role,
            );
            if access == TenantAccess::Mismatch {
                return Ok(Decision::Denied(Denial::Forbidden(
                    ForbiddenReason::TenantMismatch {
                        principal: principal.tenant,
                        resource,
                    },
                )));
            }
        }

        Ok(Decision::Allowed)
    }

    fn requirement(&self, action: &str) -> std::result::Result<Requirement, ForbiddenReason> {
        match self.requirements.get(action) {
            Some(requirement) => Ok(requirement.clone()),
            None if self.policy.deny_unregistered_actions => {
                Err(ForbiddenReason::UnregisteredAction(action.to_string()))
            }
            None => Ok(Requirement::none()),
        }
    }

    async fn resolve(
        &self,
        principal: &Principal,
        scope: Option<&RequestScope>,
    ) -> Result<Arc<Resolution>> {
        match scope {
            Some(scope) => scope.resolve(&self.engine, principal.id).await,
            None => Ok(Arc::new(self.engine.resolve(principal.id).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{NewPermission, NewPrincipal, NewRole, PrincipalId};
    use gatehouse_store::{MemoryStore, StoreExt};

    struct Fixture {
        store: Arc<MemoryStore>,
        guard: AuthorizationGuard<MemoryStore>,
        society: TenantId,
    }

    async fn fixture(policy: GuardPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let view = store
            .insert_permission(&NewPermission::new("view_amenities"))
            .await
            .unwrap();
        let manage = store
            .insert_permission(&NewPermission::new("manage_amenities"))
            .await
            .unwrap();
        store
            .insert_role(&NewRole::new("USER").with_permissions([view.id]))
            .await
            .unwrap();
        store
            .insert_role(&NewRole::new("MANAGER").with_permissions([view.id, manage.id]))
            .await
            .unwrap();
        store
            .insert_role(&NewRole::new("SUPERADMIN").with_permissions([view.id, manage.id]))
            .await
            .unwrap();

        let requirements = RequirementMap::builder()
            .action("createAmenity", ["manage_amenities"])
            .action("listAmenities", ["view_amenities"])
            .action("editAmenity", ["view_amenities", "manage_amenities"])
            .open("getProfile")
            .build();

        let guard = AuthorizationGuard::new(
            PermissionEngine::new(store.clone()),
            Arc::new(requirements),
            policy,
        );
        Fixture {
            store,
            guard,
            society: TenantId::new_v4(),
        }
    }

    impl Fixture {
        async fn principal(&self, roles: &[&str], tenant: Option<TenantId>) -> Principal {
            let id = PrincipalId::new_v4();
            let mut new = NewPrincipal::new(id);
            new.tenant = tenant;
            self.store.insert_principal(&new).await.unwrap();
            for name in roles {
                let role = self.store.find_role_by_name(name).await.unwrap().unwrap();
                self.store.add_principal_role(id, role.id).await.unwrap();
            }
            self.store.load_principal(id).await.unwrap().unwrap()
        }
    }

    fn missing(decision: &Decision) -> Option<Vec<String>> {
        match decision.denial() {
            Some(Denial::Forbidden(ForbiddenReason::MissingPermissions(m))) => Some(m.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_no_principal_is_unauthenticated_even_when_open() {
        let f = fixture(GuardPolicy::default()).await;
        for action in ["createAmenity", "getProfile", "neverRegistered"] {
            let decision = f.guard.check(Check::new(action, None)).await.unwrap();
            assert_eq!(decision, Decision::Denied(Denial::Unauthenticated));
        }
    }

    #[tokio::test]
    async fn test_required_permission() {
        let f = fixture(GuardPolicy::default()).await;
        let user = f.principal(&["USER"], Some(f.society)).await;
        let manager = f.principal(&["MANAGER"], Some(f.society)).await;

        let denied = f.guard.check(Check::new("createAmenity", Some(&user))).await.unwrap();
        assert_eq!(missing(&denied), Some(vec!["manage_amenities".to_string()]));

        let allowed = f.guard.check(Check::new("createAmenity", Some(&manager))).await.unwrap();
        assert!(allowed.is_allowed());
    }

    #[tokio::test]
    async fn test_all_required_permissions_needed() {
        let f = fixture(GuardPolicy::default()).await;
        let user = f.principal(&["USER"], None).await;

        let decision = f.guard.check(Check::new("editAmenity", Some(&user))).await.unwrap();
        assert_eq!(missing(&decision), Some(vec!["manage_amenities".to_string()]));
    }

    #[tokio::test]
    async fn test_open_and_unregistered_actions() {
        let f = fixture(GuardPolicy::default()).await;
        let nobody = f.principal(&[], None).await;

        assert!(f.guard.check(Check::new("getProfile", Some(&nobody))).await.unwrap().is_allowed());
        assert!(f
            .guard
            .check(Check::new("neverRegistered", Some(&nobody)))
            .await
            .unwrap()
            .is_allowed());

        let strict = fixture(GuardPolicy {
            deny_unregistered_actions: true,
            ..GuardPolicy::default()
        })
        .await;
        let nobody = strict.principal(&[], None).await;
        let decision = strict
            .guard
            .check(Check::new("neverRegistered", Some(&nobody)))
            .await
            .unwrap();
        assert_eq!(
            decision.denial(),
            Some(&Denial::Forbidden(ForbiddenReason::UnregisteredAction(
                "neverRegistered".into()
            )))
        );
    }

    #[tokio::test]
    async fn test_tenant_dimension() {
        let f = fixture(GuardPolicy::default()).await;
        let manager = f.principal(&["MANAGER"], Some(f.society)).await;
        let admin = f.principal(&["SUPERADMIN"], None).await;
        let other = TenantId::new_v4();

        let same = Check::new("createAmenity", Some(&manager)).in_tenant(f.society);
        assert!(f.guard.check(same).await.unwrap().is_allowed());

        let foreign = Check::new("createAmenity", Some(&manager)).in_tenant(other);
        let decision = f.guard.check(foreign).await.unwrap();
        assert!(matches!(
            decision.denial(),
            Some(Denial::Forbidden(ForbiddenReason::TenantMismatch { .. }))
        ));

        let bypass = Check::new("createAmenity", Some(&admin)).in_tenant(other);
        assert!(f.guard.check(bypass).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_tenant_applies_to_open_actions() {
        let f = fixture(GuardPolicy::default()).await;
        let user = f.principal(&["USER"], Some(f.society)).await;

        let foreign = Check::new("getProfile", Some(&user)).in_tenant(TenantId::new_v4());
        assert!(!f.guard.check(foreign).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_enforce_maps_denial() {
        let f = fixture(GuardPolicy::default()).await;
        let err = f.guard.enforce(Check::new("createAmenity", None)).await.unwrap_err();
        assert_eq!(err.denial(), Some(&Denial::Unauthenticated));
    }

    #[tokio::test]
    async fn test_scoped_check_sees_revocation() {
        let f = fixture(GuardPolicy::default()).await;
        let manager = f.principal(&["MANAGER"], None).await;
        let scope = RequestScope::new();
        let check = Check::new("createAmenity", Some(&manager));

        assert!(f.guard.check_scoped(check, &scope).await.unwrap().is_allowed());

        let role = f.store.find_role_by_name("MANAGER").await.unwrap().unwrap();
        f.store.remove_principal_role(manager.id, role.id).await.unwrap();

        assert!(!f.guard.check_scoped(check, &scope).await.unwrap().is_allowed());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use proptest::sample::subsequence;

        const CATALOG: [&str; 5] = ["p0", "p1", "p2", "p3", "p4"];

        async fn decide(held: Vec<&'static str>, required: Vec<&'static str>) -> Decision {
            let store = Arc::new(MemoryStore::new());
            let mut ids = Vec::new();
            for name in CATALOG {
                let permission = store.insert_permission(&NewPermission::new(name)).await.unwrap();
                if held.contains(&name) {
                    ids.push(permission.id);
                }
            }
            let role = store
                .insert_role(&NewRole::new("HOLDER").with_permissions(ids))
                .await
                .unwrap();
            let id = PrincipalId::new_v4();
            store.insert_principal(&NewPrincipal::new(id)).await.unwrap();
            store.add_principal_role(id, role.id).await.unwrap();
            let principal = store.load_principal(id).await.unwrap().unwrap();

            let guard = AuthorizationGuard::new(
                PermissionEngine::new(store),
                Arc::new(RequirementMap::builder().action("act", required).build()),
                GuardPolicy::default(),
            );
            guard.check(Check::new("act", Some(&principal))).await.unwrap()
        }

        proptest! {
            #[test]
            fn test_missing_is_required_minus_held(
                held in subsequence(CATALOG.to_vec(), 0..=5),
                required in subsequence(CATALOG.to_vec(), 0..=5),
            ) {
                let expected: Vec<String> = required
                    .iter()
                    .filter(|p| !held.contains(*p))
                    .map(|p| p.to_string())
                    .collect();
                let decision = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap()
                    .block_on(decide(held, required));

                if expected.is_empty() {
                    prop_assert!(decision.is_allowed());
                } else {
                    prop_assert_eq!(missing(&decision), Some(expected));
                }
            }
        }
    }
}
