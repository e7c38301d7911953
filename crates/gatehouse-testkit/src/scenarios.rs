//! Golden authorization scenarios.
//!
//! Each scenario is a small role matrix, a requirement table and the
//! decisions it must produce. They run unchanged against every store.

use gatehouse::core::{Decision, Denial, RequirementMap};
use gatehouse::store::Store;
use gatehouse::{Principal, Result};

use crate::fixtures::Fixture;

/// Expected outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Allowed,
    Unauthenticated,
    Forbidden,
}

impl Expected {
    pub fn of(decision: &Decision) -> Self {
        match decision {
            Decision::Allowed => Expected::Allowed,
            Decision::Denied(Denial::Unauthenticated) => Expected::Unauthenticated,
            Decision::Denied(Denial::Forbidden(_)) => Expected::Forbidden,
        }
    }
}

/// A golden scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    /// Role name and the permissions it holds.
    pub roles: Vec<(&'static str, Vec<&'static str>)>,
    /// Principal label and the roles it holds.
    pub principals: Vec<(&'static str, Vec<&'static str>)>,
    /// Action and its required permissions.
    pub actions: Vec<(&'static str, Vec<&'static str>)>,
    /// Principal label (`None` for no principal), action, expected outcome.
    pub checks: Vec<(Option<&'static str>, &'static str, Expected)>,
}

impl Scenario {
    pub fn requirements(&self) -> RequirementMap {
        self.actions
            .iter()
            .fold(RequirementMap::builder(), |builder, (action, permissions)| {
                builder.action(*action, permissions.iter().copied())
            })
            .build()
    }
}

/// Result of one scenario check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub principal: Option<&'static str>,
    pub action: &'static str,
    pub expected: Expected,
    pub actual: Expected,
}

impl Outcome {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Get all golden scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "amenity manager and receptionist",
            roles: vec![
                ("MANAGER", vec!["manage_amenities", "view_amenities"]),
                ("RECEPTIONIST", vec!["view_amenities"]),
            ],
            principals: vec![("U1", vec!["MANAGER"]), ("U2", vec!["RECEPTIONIST"])],
            actions: vec![
                ("createAmenity", vec!["manage_amenities"]),
                ("listAmenities", vec!["view_amenities"]),
            ],
            checks: vec![
                (Some("U1"), "createAmenity", Expected::Allowed),
                (Some("U1"), "listAmenities", Expected::Allowed),
                (Some("U2"), "createAmenity", Expected::Forbidden),
                (Some("U2"), "listAmenities", Expected::Allowed),
                (None, "listAmenities", Expected::Unauthenticated),
            ],
        },
        Scenario {
            name: "overlapping roles union",
            roles: vec![
                ("A", vec!["p1", "p2"]),
                ("B", vec!["p2", "p3"]),
            ],
            principals: vec![("both", vec!["A", "B"]), ("only_a", vec!["A"])],
            actions: vec![
                ("needsP1P3", vec!["p1", "p3"]),
                ("needsP2", vec!["p2"]),
            ],
            checks: vec![
                (Some("both"), "needsP1P3", Expected::Allowed),
                (Some("both"), "needsP2", Expected::Allowed),
                (Some("only_a"), "needsP1P3", Expected::Forbidden),
                (Some("only_a"), "needsP2", Expected::Allowed),
            ],
        },
        Scenario {
            name: "open action needs a principal",
            roles: vec![],
            principals: vec![("nobody", vec![])],
            actions: vec![("getProfile", vec![]), ("listAmenities", vec!["view_amenities"])],
            checks: vec![
                (Some("nobody"), "getProfile", Expected::Allowed),
                (Some("nobody"), "listAmenities", Expected::Forbidden),
                (None, "getProfile", Expected::Unauthenticated),
            ],
        },
    ]
}

/// Set up `scenario` in `fixture` and run its checks.
///
/// The fixture must have been built with [`Scenario::requirements`].
pub async fn run_scenario<S: Store>(
    fixture: &Fixture<S>,
    scenario: &Scenario,
) -> Result<Vec<Outcome>> {
    for (role, permissions) in &scenario.roles {
        fixture.role(role, permissions).await?;
    }

    let mut principals: Vec<(&str, Principal)> = Vec::with_capacity(scenario.principals.len());
    for (label, roles) in &scenario.principals {
        principals.push((*label, fixture.principal(roles).await?));
    }

    let mut outcomes = Vec::with_capacity(scenario.checks.len());
    for &(label, action, expected) in &scenario.checks {
        let principal = label.and_then(|label| {
            principals
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, p)| p)
        });
        let decision = fixture.authorize(action, principal).await?;
        outcomes.push(Outcome {
            principal: label,
            action,
            expected,
            actual: Expected::of(&decision),
        });
    }
    Ok(outcomes)
}
