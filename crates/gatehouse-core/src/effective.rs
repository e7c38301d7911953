//! Effective permission sets.
//!
//! The effective set of a principal is the union, over every role it holds,
//! of that role's permission names. It is derived, never persisted.

use std::collections::BTreeSet;

use crate::model::Role;

/// The set of permission names reachable from a principal through its roles.
///
/// Backed by an ordered set so that identical inputs always produce an
/// identical value regardless of the order roles were loaded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    names: BTreeSet<String>,
}

impl EffectivePermissions {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Union the permission names of every given role.
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Self {
        let names = roles
            .into_iter()
            .flat_map(|role| role.permission_names())
            .map(str::to_owned)
            .collect();
        Self { names }
    }

    /// Check membership of a single permission name.
    pub fn contains(&self, permission: &str) -> bool {
        self.names.contains(permission)
    }

    /// True if every required name is present.
    ///
    /// An empty requirement is always satisfied.
    pub fn satisfies<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|p| self.contains(p.as_ref()))
    }

    /// Required names that are not present, in requirement order.
    pub fn missing<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !self.contains(p))
            .map(str::to_owned)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the names in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Consume into the underlying set.
    pub fn into_set(self) -> BTreeSet<String> {
        self.names
    }
}

impl FromIterator<String> for EffectivePermissions {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
