//! Command-line interface definitions for the `automl-harness` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand};

/// Top-level CLI for the `automl-harness` binary.
#[derive(Debug, Parser)]
#[command(
    name = "automl-harness",
    about = "Run AutoML batch prediction scenarios with guaranteed cleanup",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    pub(crate) log_level: String,
    /// Log format: `pretty`, `compact`, or `json`.
    #[arg(long, global = true, value_name = "FORMAT", default_value = "pretty")]
    pub(crate) log_format: String,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of the `automl-harness` binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List models in the configured location.
    #[command(name = "list-models", about = "List models in the configured location")]
    ListModels(ListModelsCommand),
    /// Deploy the configured model unless it is already deployed.
    #[command(
        name = "ensure-deployed",
        about = "Deploy the configured model unless it is already deployed"
    )]
    EnsureDeployed,
    /// Run a batch prediction without setup or cleanup.
    #[command(name = "batch-predict", about = "Run a batch prediction")]
    BatchPredict(BatchPredictCommand),
    /// Run the full deploy, predict, and sweep scenario.
    #[command(
        name = "scenario",
        about = "Run the batch prediction scenario with setup and teardown"
    )]
    Scenario,
}

/// Arguments for the `automl-harness list-models` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ListModelsCommand {
    /// AutoML list filter, for example `textExtractionModelMetadata:*`.
    #[arg(long, value_name = "EXPR", default_value = "")]
    pub(crate) filter: String,
}

/// Arguments for the `automl-harness batch-predict` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct BatchPredictCommand {
    /// Input file, overriding the configured `gs://` input object.
    #[arg(long, value_name = "URI")]
    pub(crate) input_uri: Option<String>,
    /// Output prefix, overriding the configured `gs://` output prefix.
    #[arg(long, value_name = "URI")]
    pub(crate) output_uri: Option<String>,
}
