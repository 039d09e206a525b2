mod config;

use crate::config::{AppConfig, OutputFormat};
use anyhow::Context;
use clap::Parser;
use quickcep_lookup::{Fetcher, HttpFetcher, PostalCode, Race, RaceOutcome, SourceKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    init_tracing();

    let config = AppConfig::parse(&cli)?;
    tracing::debug!(?config, "Parsed config");

    let race = create_race(&config)?;
    tracing::info!(
        postal_code = %config.postal_code,
        sources = ?race.sources(),
        deadline = ?race.deadline(),
        "Looking up address"
    );

    let outcome = race.run(&config.postal_code).await;
    println!("{}", render_outcome(&outcome, config.output)?);

    Ok(())
}

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Resolve a Brazilian postal code using whichever lookup service answers first")]
#[command(
    long_about = "Queries all configured postal code lookup services concurrently and prints the first answer received before the timeout. Answers arriving later are discarded."
)]
pub struct CliArgs {
    /// Postal code (CEP) to resolve, e.g. 05874120 or 05874-120
    pub postal_code: Option<PostalCode>,

    /// Maximum time to wait for the first answer, in milliseconds
    #[arg(short, long = "timeout", value_name = "MILLIS")]
    pub timeout_millis: Option<u64>,

    /// Source to query, can be repeated (brasil_api, via_cep). Defaults to all sources
    #[arg(short, long = "source", value_name = "SOURCE")]
    pub sources: Vec<SourceKind>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Additional config file, takes precedence over the default locations
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,quickcep_lookup=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn create_race(config: &AppConfig) -> anyhow::Result<Race> {
    let client = quickcep_lookup::default_http_client().context("Failed to create HTTP client")?;

    let fetchers = config
        .sources
        .iter()
        .map(|kind| {
            Arc::new(HttpFetcher::new(config.source(*kind), client.clone())) as Arc<dyn Fetcher>
        })
        .collect();

    Ok(Race::new(fetchers, config.timeout())?.with_cancel_losers(config.cancel_losers))
}

fn render_outcome(outcome: &RaceOutcome, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string(&outcome.report()).context("Failed to serialize outcome");
    }

    Ok(match outcome {
        RaceOutcome::Success { source, record } => {
            format!("Source: {source}\nAddress:\n{record}")
        }
        RaceOutcome::Failure { source, error } => format!("Error: {source}: {error}"),
        RaceOutcome::Timeout { .. } => "Error: timeout".to_string(),
    })
}
