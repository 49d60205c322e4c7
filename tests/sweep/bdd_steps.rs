//! BDD step definitions for sweeper behaviour.

use automl_harness::Sweeper;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{BUCKET, NESTED_OUTPUTS, SweepContext, SweepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a bucket holding outputs three levels below \"{prefix}\"")]
fn bucket_with_nested_outputs(sweep_context: SweepContext, prefix: String) -> SweepContext {
    for name in NESTED_OUTPUTS {
        sweep_context
            .store
            .insert(BUCKET, &format!("{}{name}", prefix.trim()));
    }
    sweep_context
}

#[given("an unrelated object \"{name}\"")]
fn unrelated_object(sweep_context: SweepContext, name: String) -> SweepContext {
    sweep_context.store.insert(BUCKET, name.trim());
    sweep_context
}

#[given("an empty bucket")]
fn empty_bucket(sweep_context: SweepContext) -> SweepContext {
    sweep_context
}

#[given("a bucket with directory placeholders below \"{prefix}\"")]
fn bucket_with_placeholders(sweep_context: SweepContext, prefix: String) -> SweepContext {
    let root = prefix.trim();
    sweep_context.store.insert(BUCKET, root);
    sweep_context.store.insert(BUCKET, &format!("{root}a/"));
    sweep_context
        .store
        .insert(BUCKET, &format!("{root}a/result.jsonl"));
    sweep_context
}

#[given("deleting \"{name}\" fails")]
fn deleting_fails(sweep_context: SweepContext, name: String) -> SweepContext {
    sweep_context.store.fail_delete_on(name.trim());
    sweep_context
}

#[when("I sweep \"{prefix}\"")]
fn run_sweep(mut sweep_context: SweepContext, prefix: String) -> Result<SweepContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let sweeper = Sweeper::new(sweep_context.store.clone());
    let result = runtime.block_on(async { sweeper.sweep(BUCKET, prefix.trim()).await });
    sweep_context.outcome = Some(match result {
        Ok(summary) => SweepOutcome::Success(summary),
        Err(err) => SweepOutcome::Failure(err.to_string()),
    });
    Ok(sweep_context)
}

fn success(sweep_context: &SweepContext) -> Result<automl_harness::SweepSummary, StepError> {
    match sweep_context.outcome.as_ref() {
        Some(SweepOutcome::Success(summary)) => Ok(*summary),
        other => Err(StepError::Assertion(format!(
            "expected a successful sweep, got: {other:?}"
        ))),
    }
}

fn failure(sweep_context: &SweepContext) -> Result<&str, StepError> {
    match sweep_context.outcome.as_ref() {
        Some(SweepOutcome::Failure(message)) => Ok(message),
        other => Err(StepError::Assertion(format!(
            "expected the sweep to fail, got: {other:?}"
        ))),
    }
}

#[then("the sweeper reports deleting \"{count}\" objects")]
fn reports_deleted(sweep_context: &SweepContext, count: usize) -> Result<(), StepError> {
    let summary = success(sweep_context)?;
    if summary.deleted_objects == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} deletions, got {summary:?}"
        )))
    }
}

#[then("the sweeper reports skipping \"{count}\" placeholders")]
fn reports_skipped(sweep_context: &SweepContext, count: usize) -> Result<(), StepError> {
    let summary = success(sweep_context)?;
    if summary.skipped_placeholders == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} skipped placeholders, got {summary:?}"
        )))
    }
}

#[then("only \"{first}\" and \"{second}\" remain")]
fn only_these_remain(
    sweep_context: &SweepContext,
    first: String,
    second: String,
) -> Result<(), StepError> {
    let mut expected = vec![first.trim().to_owned(), second.trim().to_owned()];
    expected.sort();
    let remaining = sweep_context.store.objects(BUCKET);
    if remaining == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected:?} to remain, got {remaining:?}"
        )))
    }
}

#[then("the sweep is refused")]
fn sweep_refused(sweep_context: &SweepContext) -> Result<(), StepError> {
    let message = failure(sweep_context)?;
    if message.contains("refusing to sweep prefix") {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a refused prefix, got: {message}"
        )))
    }
}

#[then("no object was deleted")]
fn nothing_deleted(sweep_context: &SweepContext) -> Result<(), StepError> {
    let deleted = sweep_context.store.deleted();
    let listed = sweep_context.store.listed_prefixes();
    if deleted.is_empty() && listed.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no remote calls, got deletions {deleted:?} and listings {listed:?}"
        )))
    }
}

#[then("the sweep fails mentioning \"{name}\"")]
fn sweep_fails_mentioning(sweep_context: &SweepContext, name: String) -> Result<(), StepError> {
    let message = failure(sweep_context)?;
    if message.contains("failed to delete") && message.contains(name.trim()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a delete failure for {name}, got: {message}"
        )))
    }
}

#[then("the object \"{name}\" remains")]
fn object_remains(sweep_context: &SweepContext, name: String) -> Result<(), StepError> {
    let remaining = sweep_context.store.objects(BUCKET);
    if remaining.iter().any(|object| object == name.trim()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {name} to remain, got {remaining:?}"
        )))
    }
}
