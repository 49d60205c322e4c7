//! Binary entry point for the AutoML harness CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::info;

use automl_harness::config::require_credentials;
use automl_harness::{
    BatchPredictHarness, BatchPredictRequest, ConfigError, DeployError, DeployOutcome,
    DeploymentGuard, GcpClient, GcpError, GcsUri, HarnessConfig, LogFormat, LoggingError,
    PredictError, ResourceNameError, ScenarioError, init_tracing, predict,
};

mod cli;

use cli::{BatchPredictCommand, Cli, Command, ListModelsCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ResourceNameError),
    #[error("Google Cloud client error: {0}")]
    Client(#[from] GcpError),
    #[error("{0}")]
    Deploy(#[from] DeployError<GcpError>),
    #[error("{0}")]
    Predict(#[from] PredictError<GcpError>),
    #[error("scenario {name} failed: {source}")]
    Scenario {
        name: String,
        #[source]
        source: ScenarioError,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let format: LogFormat = cli.log_format.parse()?;
    init_tracing(&cli.log_level, format)?;

    let config = HarnessConfig::load_without_cli_args()?;
    config.validate()?;

    let mut stdout = io::stdout();
    match cli.command {
        Command::ListModels(args) => list_models(&config, &args, &mut stdout).await,
        Command::EnsureDeployed => ensure_deployed(&config, &mut stdout).await,
        Command::BatchPredict(args) => batch_predict(&config, &args, &mut stdout).await,
        Command::Scenario => run_scenario(&config, &mut stdout).await,
    }
}

async fn connect() -> Result<GcpClient, CliError> {
    require_credentials()?;
    Ok(GcpClient::from_adc().await?)
}

async fn list_models(
    config: &HarnessConfig,
    args: &ListModelsCommand,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let location = config.model_name()?.location();
    let client = connect().await?;
    let count = predict::list_models(&client, &location, &args.filter, out).await?;
    info!(%location, count, "listed models");
    Ok(0)
}

async fn ensure_deployed(config: &HarnessConfig, out: &mut impl Write) -> Result<i32, CliError> {
    let model = config.model_name()?;
    let guard = DeploymentGuard::new(connect().await?);
    let outcome = guard.ensure_deployed(&model).await?;
    writeln!(out, "Model {model} {}", describe_outcome(outcome))?;
    Ok(0)
}

const fn describe_outcome(outcome: DeployOutcome) -> &'static str {
    match outcome {
        DeployOutcome::AlreadyDeployed => "was already deployed.",
        DeployOutcome::Deployed => "deployed.",
        DeployOutcome::AwaitedTransition => "deployed after its pending transition.",
    }
}

async fn batch_predict(
    config: &HarnessConfig,
    args: &BatchPredictCommand,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let model = config.model_name()?;
    let request = batch_request(config, args)?;
    let client = connect().await?;
    predict::batch_predict(&client, &model, &request, out).await?;
    Ok(0)
}

fn batch_request(
    config: &HarnessConfig,
    args: &BatchPredictCommand,
) -> Result<BatchPredictRequest, CliError> {
    let mut request = config.batch_predict_request()?;
    if let Some(uri) = &args.input_uri {
        request.input_uris = vec![GcsUri::parse(uri)?];
    }
    if let Some(uri) = &args.output_uri {
        request.output_uri_prefix = GcsUri::parse(uri)?;
    }
    Ok(request)
}

async fn run_scenario(config: &HarnessConfig, out: &mut impl Write) -> Result<i32, CliError> {
    let client = connect().await?;
    let harness = BatchPredictHarness::from_config(config, client.clone(), client)?;
    let outcome = harness.run().await;
    out.write_all(outcome.output.as_bytes())?;

    let name = outcome.name.clone();
    let id = outcome.scenario_id;
    let deleted = outcome.sweep.map_or(0, |summary| summary.deleted_objects);
    outcome
        .into_result()
        .map_err(|source| CliError::Scenario {
            name: name.clone(),
            source,
        })?;
    writeln!(
        out,
        "scenario {name} passed (id {id}, deleted {deleted} objects)"
    )?;
    Ok(0)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
