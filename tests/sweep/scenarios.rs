//! BDD scenarios for the storage sweeper.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SweepContext, sweep_context};

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Delete nested outputs below the prefix"
)]
fn scenario_delete_nested_outputs(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Sweeping an empty prefix succeeds"
)]
fn scenario_empty_prefix(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Leave directory placeholders in place"
)]
fn scenario_placeholders(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Refuse to sweep the bucket root"
)]
fn scenario_refuse_root(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Stop at the first delete failure"
)]
fn scenario_delete_failure(sweep_context: SweepContext) {
    let _ = sweep_context;
}
