//! Storage janitor for AutoML scenario runs.
//!
//! This binary deletes every leaf object left below a scenario output prefix
//! (for example after an aborted run) and reports what it removed.

use clap::Parser;
use automl_harness::config::{default_bucket, require_credentials};
use automl_harness::sweep::DEFAULT_MAX_DEPTH;
use automl_harness::{GcpClient, LogFormat, Sweeper, init_tracing};
use std::io::Write as _;

#[derive(Debug, Parser)]
#[command(
    name = "automl-janitor",
    about = "Delete objects left below an AutoML scenario output prefix"
)]
struct Cli {
    /// Bucket holding scenario outputs. Defaults to `<project>-lcm`.
    #[arg(long, env = "AUTOML_BUCKET_ID")]
    bucket: Option<String>,
    /// Project whose default bucket is swept when no bucket is given.
    #[arg(long, env = "AUTOML_PROJECT_ID")]
    project: Option<String>,
    /// Prefix to sweep; must end with `/`.
    #[arg(long, env = "AUTOML_OUTPUT_PREFIX", default_value = "TEST_BATCH_PREDICT/")]
    prefix: String,
    /// Directory levels walked below the prefix.
    #[arg(long, env = "AUTOML_SWEEP_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn bucket(&self) -> Result<String, String> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        non_blank(&self.bucket)
            .or_else(|| non_blank(&self.project).map(|project| default_bucket(&project)))
            .ok_or_else(|| {
                String::from(
                    "no bucket to sweep: set --bucket (AUTOML_BUCKET_ID) or \
                     --project (AUTOML_PROJECT_ID)",
                )
            })
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, LogFormat::Compact).map_err(|err| err.to_string())?;
    let bucket = cli.bucket()?;
    require_credentials().map_err(|err| err.to_string())?;
    let client = GcpClient::from_adc().await.map_err(|err| err.to_string())?;
    let summary = Sweeper::new(client)
        .with_max_depth(cli.max_depth)
        .sweep(&bucket, &cli.prefix)
        .await
        .map_err(|err| err.to_string())?;
    writeln!(
        std::io::stdout(),
        "janitor sweep complete: bucket={bucket}, deleted_objects={}, \
         visited_directories={}, skipped_placeholders={}",
        summary.deleted_objects,
        summary.visited_directories,
        summary.skipped_placeholders
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}
