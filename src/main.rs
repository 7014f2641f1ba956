//! Tremor Analytics CLI
//!
//! Aggregation, trend analysis and reporting over tremor sensor events.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tremor_analytics::{
    config::Config,
    report::{ExportFormat, PatientInfo, PeriodKind, ReportRequest},
    service::AnalyticsService,
    source::{load_events, MemoryEventSource},
    VERSION,
};

#[derive(Parser)]
#[command(name = "tremor-analytics")]
#[command(version = VERSION)]
#[command(about = "Time-windowed aggregation and trend analysis of tremor sensor events", long_about = None)]
struct Cli {
    /// Event file (JSON or CSV); defaults to the configured events_path
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    /// Owner whose events are analyzed
    #[arg(long, global = true, default_value = "default")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Statistics for one day
    Daily {
        /// Day to analyze (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Monday-aligned weekly trend
    Weekly {
        /// Weeks back from the current week (0-52)
        #[arg(long, default_value = "0")]
        week_offset: u32,
    },

    /// Per-day series over the last N days
    Trend {
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Statistics and distributions over the last N days
    Summary {
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Generate a report
    Report {
        /// Period kind (daily, weekly, monthly or custom)
        #[arg(long, default_value = "weekly")]
        period: PeriodKind,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        end_date: Option<NaiveDate>,

        #[arg(long)]
        week_offset: Option<u32>,
    },

    /// Export raw events between two days (inclusive)
    Export {
        #[arg(long)]
        start_date: NaiveDate,

        #[arg(long)]
        end_date: NaiveDate,

        /// Export format (csv or json)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Only export events from this device
        #[arg(long)]
        device_id: Option<String>,

        /// Output directory, the configured export_path if omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Clinician summary of the last N days
    Doctor {
        #[arg(long, default_value = "7")]
        days: i64,

        /// Patient name shown in the summary
        #[arg(long)]
        name: Option<String>,
    },

    /// Today, this week and this month at a glance
    QuickStats,

    /// Serve the HTTP API
    Serve {
        /// Port to bind, the configured server_port if omitted
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {}", e);
        Config::default()
    });

    let owner = cli.owner;
    let events = cli.events;
    let service = || build_service(&config, events.clone(), &owner);

    match cli.command {
        Commands::Config => cmd_config(&config),
        Commands::Daily { date } => print_json(&service()?.daily(&owner, date)?),
        Commands::Weekly { week_offset } => print_json(&service()?.weekly(&owner, week_offset)?),
        Commands::Trend { days } => print_json(&service()?.trend(&owner, days)?),
        Commands::Summary { days } => print_json(&service()?.summary(&owner, days)?),
        Commands::Report {
            period,
            start_date,
            end_date,
            week_offset,
        } => {
            let request = ReportRequest {
                period_kind: period,
                start_date,
                end_date,
                week_offset,
            };
            print_json(&service()?.generate_report(&owner, &request)?)
        }
        Commands::Export {
            start_date,
            end_date,
            format,
            device_id,
            output,
        } => {
            let request = ReportRequest::custom(start_date, end_date);
            let file = service()?.export(&owner, &request, device_id.as_deref(), format)?;

            let dir = output.unwrap_or_else(|| config.export_path.clone());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating export directory {dir:?}"))?;
            let path = dir.join(&file.filename);
            std::fs::write(&path, &file.body).with_context(|| format!("writing {path:?}"))?;

            println!("Exported to {path:?}");
            Ok(())
        }
        Commands::Doctor { days, name } => {
            let patient = PatientInfo {
                owner_id: owner.clone(),
                display_name: name,
            };
            print_json(&service()?.doctor_summary(&owner, patient, days)?)
        }
        Commands::QuickStats => print_json(&service()?.quick_stats(&owner)?),
        Commands::Serve { port } => cmd_serve(service()?, port.unwrap_or(config.server_port)),
    }
}

/// Load the event file and wrap it in a service for `owner`.
fn build_service(
    config: &Config,
    events: Option<PathBuf>,
    owner: &str,
) -> anyhow::Result<AnalyticsService> {
    let path = events.unwrap_or_else(|| config.events_path.clone());
    let events = load_events(&path)?;
    let source = MemoryEventSource::for_owner(owner, events);

    Ok(AnalyticsService::from_config(Arc::new(source), config)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    print_json(config)
}

#[cfg(feature = "server")]
fn cmd_serve(service: AnalyticsService, port: u16) -> anyhow::Result<()> {
    use tremor_analytics::server::{self, ServerConfig};

    let runtime = tokio::runtime::Runtime::new()?;
    let (addr, shutdown_tx) = runtime.block_on(server::run(ServerConfig::new(port), service))?;

    println!("Tremor Analytics v{VERSION}");
    println!("Listening on http://{addr}");
    println!("Press Ctrl+C to stop");

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("setting Ctrl+C handler")?;

    let _ = stop_rx.recv();
    println!();
    println!("Stopping server...");
    let _ = shutdown_tx.send(());
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    Ok(())
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_service: AnalyticsService, _port: u16) -> anyhow::Result<()> {
    anyhow::bail!("the HTTP server is not available (server feature not enabled at compile time)")
}
