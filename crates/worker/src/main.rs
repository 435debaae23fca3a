use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asa_core::analytics::{self, PeerRentEstimator, ScenarioInput, ScenarioResult, YieldScanOptions};
use asa_core::config::Settings;
use asa_core::domain::portfolio::YieldOpportunity;
use asa_core::ingest::parser::RecordFormat;
use asa_core::ingest::source::{self, Dataset, FsRecordSource};
use asa_core::llm::{NarrativeClient, NarrativeContext, OfflineNarrator};
use asa_core::predict::http::HttpPredictionClient;

#[derive(Debug, Parser)]
#[command(name = "asa_worker", about = "One-shot portfolio analytics over a data directory")]
struct Args {
    /// Directory holding the calibrated_*.csv files. Overrides ASA_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Row format: `tolerant` (last-field) or `quoted` (RFC 4180). Overrides ASA_RECORD_FORMAT.
    #[arg(long, global = true)]
    format: Option<RecordFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Portfolio dashboard snapshot.
    Summary,
    /// Every tenant with a risk tier.
    Tenants,
    /// Per-property summaries and the portfolio roll-up.
    Properties,
    /// Units of one property priced below estimated market rent.
    Yield {
        #[arg(long)]
        property: String,

        /// Ignore fewer than this many dollars of annual gain. Overrides YIELD_MIN_ANNUAL_GAIN.
        #[arg(long)]
        min_annual_gain: Option<f64>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Apply a rent / occupancy shock to the current NOI.
    Scenario {
        #[arg(long, allow_hyphen_values = true)]
        rent_change_pct: f64,

        #[arg(long, allow_hyphen_values = true)]
        occupancy_change_pct: f64,

        /// Ask the narrative service to critique the result.
        #[arg(long)]
        narrate: bool,
    },
}

#[derive(Debug, Serialize)]
struct PropertiesReport {
    properties: Vec<asa_core::domain::portfolio::PropertySummary>,
    rollup: asa_core::domain::portfolio::PortfolioRollup,
}

#[derive(Debug, Serialize)]
struct YieldReport {
    property_id: String,
    estimate_source: &'static str,
    opportunities: Vec<YieldOpportunity>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(format) = args.format {
        settings.record_format = format;
    }

    let result = run(&settings, args.command).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn run(settings: &Settings, command: Command) -> anyhow::Result<()> {
    let source = FsRecordSource::new(settings.data_dir.clone());
    let ds = source::load_dataset(&source, settings.record_format)
        .await
        .with_context(|| format!("failed to load records from {}", settings.data_dir.display()))?;

    tracing::info!(
        units = ds.units.len(),
        tenants = ds.tenants.len(),
        properties = ds.properties.len(),
        "records loaded"
    );

    match command {
        Command::Summary => print_json(&analytics::summarize(&ds.units, &ds.tenants)),
        Command::Tenants => print_json(&analytics::assess_tenants(&ds.units, &ds.tenants)),
        Command::Properties => {
            let properties = analytics::summarize_properties(&ds.properties, &ds.units, &ds.tenants);
            let rollup = analytics::roll_up(&properties);
            print_json(&PropertiesReport { properties, rollup })
        }
        Command::Yield {
            property,
            min_annual_gain,
            limit,
        } => {
            let options = YieldScanOptions {
                min_annual_gain: min_annual_gain
                    .or(settings.yield_min_annual_gain)
                    .unwrap_or(0.0),
                limit: limit.or(settings.yield_max_results),
            };
            print_json(&scan_yield(settings, &ds, property, &options).await?)
        }
        Command::Scenario {
            rent_change_pct,
            occupancy_change_pct,
            narrate,
        } => {
            let input = ScenarioInput::new(rent_change_pct, occupancy_change_pct)?;
            let narrator: Arc<dyn NarrativeClient> = if narrate {
                asa_core::llm::client_from_settings(settings)?
            } else {
                Arc::new(OfflineNarrator)
            };

            let baseline = analytics::summarize(&ds.units, &ds.tenants);
            let delta = analytics::simulate(&baseline, &input);
            let narrative = narrator
                .narrate(&NarrativeContext::Scenario {
                    rent_change_pct: input.rent_change_pct(),
                    occupancy_change_pct: input.occupancy_change_pct(),
                    revenue_delta: delta,
                })
                .await?;
            print_json(&ScenarioResult::new(&baseline, &input, narrative))
        }
    }
}

async fn scan_yield(
    settings: &Settings,
    ds: &Dataset,
    property_id: String,
    options: &YieldScanOptions,
) -> anyhow::Result<YieldReport> {
    if settings.prediction_base_url.is_some() {
        let client = HttpPredictionClient::from_settings(settings)?;
        let estimates = asa_core::predict::collect_rent_estimates(
            &client,
            &property_id,
            &ds.units,
            &ds.properties,
        )
        .await?;
        let opportunities = analytics::find_opportunities(&property_id, &ds.units, &estimates, options);
        return Ok(YieldReport {
            property_id,
            estimate_source: "prediction_service",
            opportunities,
        });
    }

    tracing::info!("PREDICTION_BASE_URL not set; estimating market rent from peer units");
    let peers = PeerRentEstimator::from_units(&ds.units);
    let opportunities = analytics::find_opportunities(&property_id, &ds.units, &peers, options);
    Ok(YieldReport {
        property_id,
        estimate_source: "peer_model",
        opportunities,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_negative_scenario_shocks() {
        let args = Args::try_parse_from([
            "asa_worker",
            "scenario",
            "--rent-change-pct",
            "10",
            "--occupancy-change-pct",
            "-5",
            "--format",
            "quoted",
        ])
        .unwrap();
        assert_eq!(args.format, Some(RecordFormat::Quoted));
        match args.command {
            Command::Scenario {
                rent_change_pct,
                occupancy_change_pct,
                narrate,
            } => {
                assert_eq!(rent_change_pct, 10.0);
                assert_eq!(occupancy_change_pct, -5.0);
                assert!(!narrate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn yield_requires_a_property() {
        assert!(Args::try_parse_from(["asa_worker", "yield"]).is_err());
    }

    #[test]
    fn rejects_unknown_record_format() {
        assert!(Args::try_parse_from(["asa_worker", "--format", "xml", "summary"]).is_err());
    }
}
