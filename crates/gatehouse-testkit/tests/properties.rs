//! Authorization properties, run against both stores.

use std::sync::Arc;

use gatehouse::core::{Decision, Denial, ForbiddenReason, RequirementMap};
use gatehouse::store::{MemoryStore, SqliteStore, Store};
use gatehouse::{ErrorKind, PermissionId, RequestScope, RoleId, RoleUpdate, TenantId};
use gatehouse_testkit::{all_scenarios, run_scenario, Fixture, GrantParams};
use proptest::prelude::*;

fn requirements() -> RequirementMap {
    RequirementMap::builder()
        .action("createAmenity", ["manage_amenities"])
        .action("listAmenities", ["view_amenities"])
        .action("manageBoth", ["p1", "p2"])
        .open("getProfile")
        .build()
}

fn memory() -> Fixture<MemoryStore> {
    Fixture::memory(requirements())
}

fn sqlite() -> Fixture<SqliteStore> {
    Fixture::sqlite(requirements()).unwrap()
}

/// Generates a `_memory` and a `_sqlite` test for a generic async check.
macro_rules! both_stores {
    ($check:ident) => {
        mod $check {
            #[tokio::test]
            async fn memory() {
                super::$check(super::memory()).await;
            }

            #[tokio::test]
            async fn sqlite() {
                super::$check(super::sqlite()).await;
            }
        }
    };
}

fn names(effective: gatehouse::EffectivePermissions) -> Vec<String> {
    effective.into_set().into_iter().collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

async fn union_of_overlapping_roles<S: Store>(fx: Fixture<S>) {
    fx.role("A", &["p1", "p2"]).await.unwrap();
    fx.role("B", &["p2", "p3"]).await.unwrap();
    let principal = fx.principal(&["A", "B"]).await.unwrap();

    let effective = fx.gatehouse.effective_permissions(principal.id).await.unwrap();
    assert_eq!(names(effective), vec!["p1", "p2", "p3"]);
}
both_stores!(union_of_overlapping_roles);

async fn principal_without_roles<S: Store>(fx: Fixture<S>) {
    let principal = fx.principal(&[]).await.unwrap();

    assert!(fx
        .gatehouse
        .effective_permissions(principal.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        fx.authorize("listAmenities", Some(&principal)).await.unwrap(),
        Decision::Denied(Denial::Forbidden(ForbiddenReason::MissingPermissions(vec![
            "view_amenities".to_string()
        ])))
    );
}
both_stores!(principal_without_roles);

async fn open_action_allows_any_principal<S: Store>(fx: Fixture<S>) {
    let principal = fx.principal(&[]).await.unwrap();
    assert!(fx.authorize("getProfile", Some(&principal)).await.unwrap().is_allowed());
    // Unregistered actions are open by default.
    assert!(fx.authorize("getWeather", Some(&principal)).await.unwrap().is_allowed());
}
both_stores!(open_action_allows_any_principal);

async fn every_required_permission_is_needed<S: Store>(fx: Fixture<S>) {
    let role = fx.role("PARTIAL", &["p1"]).await.unwrap();
    let principal = fx.principal(&["PARTIAL"]).await.unwrap();

    assert_eq!(
        fx.authorize("manageBoth", Some(&principal)).await.unwrap(),
        Decision::Denied(Denial::Forbidden(ForbiddenReason::MissingPermissions(vec![
            "p2".to_string()
        ])))
    );

    let p2 = fx.permission("p2").await.unwrap();
    fx.gatehouse.assign_permission_to_role(role.id, p2.id).await.unwrap();
    assert!(fx.authorize("manageBoth", Some(&principal)).await.unwrap().is_allowed());
}
both_stores!(every_required_permission_is_needed);

async fn no_principal_is_unauthenticated<S: Store>(fx: Fixture<S>) {
    for action in ["createAmenity", "getProfile", "getWeather"] {
        assert_eq!(
            fx.authorize(action, None).await.unwrap(),
            Decision::Denied(Denial::Unauthenticated),
            "{}",
            action
        );
    }
}
both_stores!(no_principal_is_unauthenticated);

// ─────────────────────────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────────────────────────

async fn revocation_takes_effect<S: Store>(fx: Fixture<S>) {
    let role = fx.role("RECEPTIONIST", &["view_amenities"]).await.unwrap();
    let principal = fx.principal(&["RECEPTIONIST"]).await.unwrap();
    assert!(fx.authorize("listAmenities", Some(&principal)).await.unwrap().is_allowed());

    let view = fx.permission("view_amenities").await.unwrap();
    fx.gatehouse
        .remove_permission_from_role(role.id, view.id)
        .await
        .unwrap();

    assert!(!fx
        .gatehouse
        .effective_permissions(principal.id)
        .await
        .unwrap()
        .contains("view_amenities"));
    assert!(!fx.authorize("listAmenities", Some(&principal)).await.unwrap().is_allowed());
}
both_stores!(revocation_takes_effect);

async fn role_deletion_cascades<S: Store>(fx: Fixture<S>) {
    let manager = fx.role("MANAGER", &["manage_amenities", "view_amenities"]).await.unwrap();
    fx.role("RECEPTIONIST", &["view_amenities"]).await.unwrap();
    let principal = fx.principal(&["MANAGER", "RECEPTIONIST"]).await.unwrap();

    fx.gatehouse.delete_role(manager.id).await.unwrap();

    let reloaded = fx.gatehouse.get_principal(principal.id).await.unwrap();
    assert!(!reloaded.has_role("MANAGER"));
    assert!(reloaded.has_role("RECEPTIONIST"));
    let effective = fx.gatehouse.effective_permissions(principal.id).await.unwrap();
    assert_eq!(names(effective), vec!["view_amenities"]);
}
both_stores!(role_deletion_cascades);

async fn permission_deletion_cascades<S: Store>(fx: Fixture<S>) {
    fx.role("MANAGER", &["manage_amenities"]).await.unwrap();
    let principal = fx.principal(&["MANAGER"]).await.unwrap();
    let manage = fx.permission("manage_amenities").await.unwrap();

    fx.gatehouse.delete_permission(manage.id).await.unwrap();

    assert!(fx
        .gatehouse
        .effective_permissions(principal.id)
        .await
        .unwrap()
        .is_empty());
}
both_stores!(permission_deletion_cascades);

async fn replace_is_idempotent<S: Store>(fx: Fixture<S>) {
    let role = fx.role("MC", &["z"]).await.unwrap();
    let x = fx.permission("x").await.unwrap();
    let y = fx.permission("y").await.unwrap();

    for _ in 0..2 {
        let updated = fx
            .gatehouse
            .update_role(role.id, RoleUpdate::replace_permissions([x.id, y.id]))
            .await
            .unwrap();
        let mut ids = updated.permission_ids();
        ids.sort();
        assert_eq!(ids, vec![x.id, y.id]);
    }
}
both_stores!(replace_is_idempotent);

async fn create_role_with_unknown_permission_is_atomic<S: Store>(fx: Fixture<S>) {
    let valid = fx.permission("view_amenities").await.unwrap();

    let err = fx
        .gatehouse
        .create_role("X", &[valid.id, PermissionId(9_999)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(fx.role_named("X").await.unwrap().is_none());
}
both_stores!(create_role_with_unknown_permission_is_atomic);

async fn bulk_delete_is_lenient<S: Store>(fx: Fixture<S>) {
    let role = fx.role("TEMP", &[]).await.unwrap();

    let deleted = fx
        .gatehouse
        .bulk_delete_roles(&[role.id, RoleId(9_999)])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(fx.role_named("TEMP").await.unwrap().is_none());

    let err = fx
        .gatehouse
        .bulk_delete_roles(&[RoleId(9_998), RoleId(9_999)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
both_stores!(bulk_delete_is_lenient);

// ─────────────────────────────────────────────────────────────────────────────
// Tenant scoping and request scope
// ─────────────────────────────────────────────────────────────────────────────

async fn tenant_mismatch_and_super_role<S: Store>(fx: Fixture<S>) {
    fx.role("MANAGER", &["manage_amenities"]).await.unwrap();
    fx.role("SUPERADMIN", &["manage_amenities"]).await.unwrap();
    let manager = fx.principal(&["MANAGER"]).await.unwrap();
    let admin = fx.principal_without_society(&["SUPERADMIN"]).await.unwrap();
    let elsewhere = TenantId::new_v4();

    let decision = fx
        .gatehouse
        .authorize("createAmenity", Some(&manager), Some(elsewhere))
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::Denied(Denial::Forbidden(ForbiddenReason::TenantMismatch {
            principal: Some(fx.society),
            resource: elsewhere,
        }))
    );

    assert!(fx
        .gatehouse
        .authorize("createAmenity", Some(&admin), Some(elsewhere))
        .await
        .unwrap()
        .is_allowed());
    assert!(fx.authorize("createAmenity", Some(&manager)).await.unwrap().is_allowed());
}
both_stores!(tenant_mismatch_and_super_role);

async fn request_scope_sees_mutations<S: Store>(fx: Fixture<S>) {
    let role = fx.role("RECEPTIONIST", &["view_amenities"]).await.unwrap();
    let principal = fx.principal(&["RECEPTIONIST"]).await.unwrap();
    let scope = RequestScope::new();

    let allowed = fx
        .gatehouse
        .authorize_scoped("listAmenities", Some(&principal), None, &scope)
        .await
        .unwrap();
    assert!(allowed.is_allowed());
    assert_eq!(scope.len().await, 1);

    let view = fx.permission("view_amenities").await.unwrap();
    fx.gatehouse
        .remove_permission_from_role(role.id, view.id)
        .await
        .unwrap();

    let denied = fx
        .gatehouse
        .authorize_scoped("listAmenities", Some(&principal), None, &scope)
        .await
        .unwrap();
    assert!(!denied.is_allowed());
}
both_stores!(request_scope_sees_mutations);

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

const FLIPS: usize = 200;
const READERS: usize = 4;

/// One writer flips a role between {x, y} and {z} while readers resolve the
/// holder's permissions. Every observed set must be one of the two.
async fn replace_is_never_seen_half_done<S: Store + 'static>(fx: Fixture<S>) {
    let x = fx.permission("x").await.unwrap().id;
    let y = fx.permission("y").await.unwrap().id;
    let z = fx.permission("z").await.unwrap().id;
    let role = fx.role("FLIP", &["x", "y"]).await.unwrap().id;
    let holder = fx.principal(&["FLIP"]).await.unwrap().id;
    let fx = Arc::new(fx);

    let writer = {
        let fx = fx.clone();
        tokio::spawn(async move {
            for i in 0..FLIPS {
                let ids = if i % 2 == 0 { vec![z] } else { vec![x, y] };
                fx.gatehouse
                    .update_role(role, RoleUpdate::replace_permissions(ids))
                    .await
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let fx = fx.clone();
            tokio::spawn(async move {
                for _ in 0..FLIPS {
                    let seen = names(fx.gatehouse.effective_permissions(holder).await.unwrap());
                    assert!(
                        seen == ["x", "y"] || seen == ["z"],
                        "observed a partial permission set: {:?}",
                        seen
                    );
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replace_memory() {
    replace_is_never_seen_half_done(memory()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replace_sqlite() {
    replace_is_never_seen_half_done(sqlite()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replace_on_disk_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("flip.db")).unwrap();
    replace_is_never_seen_half_done(Fixture::new(store, requirements())).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Golden scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenarios_memory() {
    for scenario in all_scenarios() {
        let fixture = Fixture::memory(scenario.requirements());
        for outcome in run_scenario(&fixture, &scenario).await.unwrap() {
            assert!(outcome.matches(), "{}: {:?}", scenario.name, outcome);
        }
    }
}

#[tokio::test]
async fn scenarios_on_disk_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    for (i, scenario) in all_scenarios().into_iter().enumerate() {
        let store = SqliteStore::open(dir.path().join(format!("scenario-{}.db", i))).unwrap();
        let fixture = Fixture::new(store, scenario.requirements());
        for outcome in run_scenario(&fixture, &scenario).await.unwrap() {
            assert!(outcome.matches(), "{}: {:?}", scenario.name, outcome);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generated role matrices
// ─────────────────────────────────────────────────────────────────────────────

async fn check_grants<S: Store>(fx: Fixture<S>, params: &GrantParams) {
    for (i, permissions) in params.roles.iter().enumerate() {
        let permissions: Vec<&str> = permissions.iter().map(String::as_str).collect();
        fx.role(&gatehouse_testkit::generators::role_name(i), &permissions)
            .await
            .unwrap();
    }
    let held = params.held_names();
    let held: Vec<&str> = held.iter().map(String::as_str).collect();
    let principal = fx.principal(&held).await.unwrap();

    let effective = fx.gatehouse.effective_permissions(principal.id).await.unwrap();
    assert_eq!(effective.into_set(), params.expected_union());

    let decision = fx.authorize("guarded", Some(&principal)).await.unwrap();
    assert_eq!(decision.is_allowed(), params.expected_allowed());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn generated_grants_memory(params: GrantParams) {
        runtime().block_on(check_grants(Fixture::memory(params.requirements()), &params));
    }

    #[test]
    fn generated_grants_sqlite(params: GrantParams) {
        let fixture = Fixture::sqlite(params.requirements()).unwrap();
        runtime().block_on(check_grants(fixture, &params));
    }
}
