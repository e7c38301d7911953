//! # Gatehouse Testkit
//!
//! Testing utilities for Gatehouse.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a Gatehouse over either store, with name-based helpers
//!   for permissions, roles and principals
//! - **Generators**: Proptest strategies for permission catalogs and role
//!   assignments, with the expected effective set and decision
//! - **Scenarios**: Golden authorization scenarios with expected outcomes
//!
//! ## Golden Scenarios
//!
//! ```rust,no_run
//! use gatehouse_testkit::{all_scenarios, run_scenario, Fixture};
//!
//! async fn check_all() -> gatehouse::Result<()> {
//!     for scenario in all_scenarios() {
//!         let fixture = Fixture::memory(scenario.requirements());
//!         for outcome in run_scenario(&fixture, &scenario).await? {
//!             assert!(outcome.matches(), "{}: {:?}", scenario.name, outcome);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use gatehouse_testkit::GrantParams;
//!
//! proptest! {
//!     #[test]
//!     fn union_is_exact(params: GrantParams) {
//!         // seed `params` into a fixture, compare with params.expected_union()
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::Fixture;
pub use generators::GrantParams;
pub use scenarios::{all_scenarios, run_scenario, Expected, Outcome, Scenario};
