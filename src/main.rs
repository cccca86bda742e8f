//! CLI entry point for the NYC taxi dashboard tool.
//!
//! Provides subcommands for loading raw trip files into Trino, aggregating
//! them locally, and provisioning the Superset dashboard over the result.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use taxi_dashboard::{
    aggregate::aggregate_trips,
    config::{RemotePolicy, RemotePolicyArgs, SupersetSettings, TrinoSettings},
    engine::TrinoClient,
    infra::superset::SupersetClient,
    loader::{LoadReport, load},
    output::{top_by_trips, write_aggregates},
    provision::{Orchestrator, ProvisionConfig, default_templates, load_templates},
    trips::{RawBatch, TripFormat},
    zones::{builtin_zones, load_zones},
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_dashboard")]
#[command(about = "Load NYC taxi trips into Trino and provision a Superset dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Layout of the raw file: green (location-keyed) or yellow (coordinate-keyed)
    #[arg(short, long, value_enum)]
    format: TripFormat,

    /// Raw trip CSV
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args)]
struct ProvisionArgs {
    /// JSON file with chart templates; defaults to the built-in NYC taxi charts
    #[arg(long)]
    charts: Option<PathBuf>,

    /// Always create the connection and dataset instead of reusing ones with the same name
    #[arg(long, default_value_t = false)]
    always_create: bool,

    /// SQLAlchemy URI Superset uses to reach Trino; derived from the Trino settings if unset
    #[arg(long, env = "SQLALCHEMY_URI")]
    sqlalchemy_uri: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a raw trip file into Trino and define the aggregate and analysis views
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// Zone reference CSV; defaults to the built-in zone table
        #[arg(short, long)]
        zones: Option<PathBuf>,

        #[command(flatten)]
        trino: TrinoSettings,

        #[command(flatten)]
        remote: RemotePolicyArgs,
    },
    /// Aggregate a raw trip file locally and write the unified records to CSV
    Aggregate {
        #[command(flatten)]
        source: SourceArgs,

        /// CSV file to write the aggregates to
        #[arg(short, long, default_value = "nyc_taxi_aggregated.csv")]
        output: PathBuf,

        /// Gzip compress the output file
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Create the Superset connection, dataset, charts and dashboard
    Provision {
        #[command(flatten)]
        args: ProvisionArgs,

        #[command(flatten)]
        trino: TrinoSettings,

        #[command(flatten)]
        superset: SupersetSettings,

        #[command(flatten)]
        remote: RemotePolicyArgs,
    },
    /// Load a raw trip file, then provision the dashboard over it
    Setup {
        #[command(flatten)]
        source: SourceArgs,

        /// Zone reference CSV; defaults to the built-in zone table
        #[arg(short, long)]
        zones: Option<PathBuf>,

        #[command(flatten)]
        args: ProvisionArgs,

        #[command(flatten)]
        trino: TrinoSettings,

        #[command(flatten)]
        superset: SupersetSettings,

        #[command(flatten)]
        remote: RemotePolicyArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/taxi_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            source,
            zones,
            trino,
            remote,
        } => {
            run_load(&source, zones.as_deref(), &trino, &remote.into()).await?;
        }
        Commands::Aggregate {
            source,
            output,
            gzip,
        } => {
            run_aggregate(&source, &output, gzip)?;
        }
        Commands::Provision {
            args,
            trino,
            superset,
            remote,
        } => {
            run_provision(&args, &trino, &superset, remote.into()).await?;
        }
        Commands::Setup {
            source,
            zones,
            args,
            trino,
            superset,
            remote,
        } => {
            let policy: RemotePolicy = remote.into();
            let report = run_load(&source, zones.as_deref(), &trino, &policy).await?;
            if report.view_rows == Some(0) {
                warn!("Aggregate view is empty; the dashboard will have no data");
            }
            run_provision(&args, &trino, &superset, policy).await?;
        }
    }

    Ok(())
}

#[tracing::instrument(skip_all, fields(file = %source.file.display(), format = %source.format))]
async fn run_load(
    source: &SourceArgs,
    zones: Option<&Path>,
    trino: &TrinoSettings,
    policy: &RemotePolicy,
) -> Result<LoadReport> {
    let batch = RawBatch::from_path(source.format, &source.file)?;
    let zones = match zones {
        Some(path) => load_zones(path)?,
        None => builtin_zones(),
    };

    let engine = TrinoClient::connect(trino, policy)?;
    let report = load(&engine, &batch, &zones).await?;

    info!(
        raw_rows = report.raw_rows,
        excluded_rows = report.excluded_rows,
        expected_groups = report.expected_groups,
        view_rows = ?report.view_rows,
        views = ?report.views,
        "Load complete"
    );
    Ok(report)
}

#[tracing::instrument(skip_all, fields(file = %source.file.display(), format = %source.format))]
fn run_aggregate(source: &SourceArgs, output: &Path, gzip: bool) -> Result<()> {
    let batch = RawBatch::from_path(source.format, &source.file)?;
    let aggregation = aggregate_trips(&batch.records()?);
    info!(
        rows = batch.len(),
        admitted = aggregation.admitted,
        excluded = aggregation.excluded,
        groups = aggregation.records.len(),
        "Aggregation complete"
    );

    let output = if gzip && output.extension() != Some(OsStr::new("gz")) {
        let mut name = output.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        output.to_path_buf()
    };
    write_aggregates(&output, &aggregation.records, gzip)?;

    for record in top_by_trips(&aggregation.records, 5) {
        info!(
            pickup_time = %record.pickup_time,
            pickup_location = ?record.pickup_location,
            trips = record.number,
            revenue = record.total_amount,
            "Top group"
        );
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(superset = %superset.url))]
async fn run_provision(
    args: &ProvisionArgs,
    trino: &TrinoSettings,
    superset: &SupersetSettings,
    policy: RemotePolicy,
) -> Result<()> {
    let uri = match &args.sqlalchemy_uri {
        Some(uri) => uri.clone(),
        None => trino.sqlalchemy_uri()?,
    };
    let charts = match &args.charts {
        Some(path) => load_templates(path)?,
        None => default_templates(),
    };

    let mut config = ProvisionConfig::nyc_taxi(&uri, &trino.schema).with_charts(charts);
    if args.always_create {
        config = config.always_create();
    }

    let client = SupersetClient::connect(superset, policy).await?;
    let mut orchestrator = Orchestrator::new(client, config);
    match orchestrator.provision().await {
        Ok(result) => {
            result.log_summary();
            Ok(())
        }
        Err(failure) => {
            failure.log_summary();
            Err(failure.into())
        }
    }
}
