//! Declared requirements and the action requirement map.
//!
//! Every guarded action declares, once, the permission names it needs. The
//! map from action id to requirement is built at startup and handed to the
//! guard as a dependency.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The static list of permission names an action demands.
///
/// All listed permissions are required (logical AND). An empty requirement
/// means the action is open to any authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Requirement {
    permissions: Vec<String>,
}

impl Requirement {
    /// Build a requirement, dropping duplicate names while keeping first-seen order.
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for p in permissions {
            let p = p.into();
            if !out.contains(&p) {
                out.push(p);
            }
        }
        Self { permissions: out }
    }

    /// The open requirement.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl From<Vec<String>> for Requirement {
    fn from(permissions: Vec<String>) -> Self {
        Self::new(permissions)
    }
}

impl From<Requirement> for Vec<String> {
    fn from(requirement: Requirement) -> Self {
        requirement.permissions
    }
}

/// Map from action id to its declared requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementMap {
    actions: BTreeMap<String, Requirement>,
}

impl RequirementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RequirementMapBuilder {
        RequirementMapBuilder::default()
    }

    /// Look up the requirement declared for an action.
    ///
    /// `None` means the action was never registered.
    pub fn get(&self, action: &str) -> Option<&Requirement> {
        self.actions.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Register or replace an action's requirement.
    pub fn insert(&mut self, action: impl Into<String>, requirement: Requirement) {
        self.actions.insert(action.into(), requirement);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over `(action, requirement)` pairs in action order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Requirement)> {
        self.actions.iter().map(|(a, r)| (a.as_str(), r))
    }

    /// Every permission name referenced by any action, deduplicated.
    pub fn referenced_permissions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .actions
            .values()
            .flat_map(|r| r.permissions.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Builder for [`RequirementMap`].
#[derive(Debug, Default)]
pub struct RequirementMapBuilder {
    map: RequirementMap,
}

impl RequirementMapBuilder {
    /// Declare the permissions an action requires.
    pub fn action<I, S>(mut self, action: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map.insert(action, Requirement::new(permissions));
        self
    }

    /// Declare an action open to any authenticated principal.
    pub fn open(mut self, action: impl Into<String>) -> Self {
        self.map.insert(action, Requirement::none());
        self
    }

    pub fn build(self) -> RequirementMap {
        self.map
    }
}
