//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::sample::subsequence;

use gatehouse::core::RequirementMap;

/// Generate a permission name.
pub fn permission_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,23}".prop_map(String::from)
}

/// Generate a catalog of distinct permission names.
pub fn catalog(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(permission_name(), 1..=max).prop_map(|set| set.into_iter().collect())
}

/// Name of the i-th generated role.
pub fn role_name(index: usize) -> String {
    format!("ROLE_{}", index)
}

/// A permission catalog, roles over it, the roles one principal holds and
/// the permissions an action requires.
#[derive(Debug, Clone)]
pub struct GrantParams {
    pub catalog: Vec<String>,
    /// Permission names per role; role `i` is named [`role_name(i)`](role_name).
    pub roles: Vec<Vec<String>>,
    /// Indices into `roles`.
    pub held: Vec<usize>,
    pub required: Vec<String>,
}

impl GrantParams {
    pub fn role_names(&self) -> Vec<String> {
        (0..self.roles.len()).map(role_name).collect()
    }

    pub fn held_names(&self) -> Vec<String> {
        self.held.iter().map(|&i| role_name(i)).collect()
    }

    /// Union of the permissions of the held roles.
    pub fn expected_union(&self) -> BTreeSet<String> {
        self.held
            .iter()
            .flat_map(|&i| self.roles[i].iter().cloned())
            .collect()
    }

    /// Whether the principal holds every required permission.
    pub fn expected_allowed(&self) -> bool {
        let union = self.expected_union();
        self.required.iter().all(|p| union.contains(p))
    }

    /// A requirement map with the single action `"guarded"`.
    pub fn requirements(&self) -> RequirementMap {
        RequirementMap::builder()
            .action("guarded", self.required.iter().cloned())
            .build()
    }
}

impl Arbitrary for GrantParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        catalog(8)
            .prop_flat_map(|catalog| {
                let size = catalog.len();
                let roles = prop::collection::vec(subsequence(catalog.clone(), 0..=size), 0..5);
                let required = subsequence(catalog.clone(), 0..=size.min(3));
                (Just(catalog), roles, required)
            })
            .prop_flat_map(|(catalog, roles, required)| {
                let count = roles.len();
                let held = subsequence((0..count).collect::<Vec<_>>(), 0..=count);
                (Just(catalog), Just(roles), held, Just(required))
            })
            .prop_map(|(catalog, roles, held, required)| GrantParams {
                catalog,
                roles,
                held,
                required,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_params_are_consistent(params: GrantParams) {
            for role in &params.roles {
                for permission in role {
                    prop_assert!(params.catalog.contains(permission));
                }
            }
            for &i in &params.held {
                prop_assert!(i < params.roles.len());
            }
            prop_assert!(params.expected_union().len() <= params.catalog.len());
        }

        #[test]
        fn test_empty_requirement_is_allowed(mut params: GrantParams) {
            params.required.clear();
            prop_assert!(params.expected_allowed());
        }
    }
}
