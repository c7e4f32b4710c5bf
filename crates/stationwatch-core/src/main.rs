//! StationWatch CLI
//!
//! Command-line interface for the StationWatch balance monitor.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::info;

use stationwatch::app::App;
use stationwatch::models::StationKind;
use stationwatch::monitor::CycleReport;
use stationwatch::Config;

/// StationWatch - Balance alerts for funding accounts
#[derive(Parser)]
#[command(name = "stationwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STATIONWATCH_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every monitor and the status report on their cadences
    Run,

    /// Run one threshold cycle now
    Check {
        /// Only check this station (all configured stations otherwise)
        #[arg(long)]
        station: Option<StationKind>,
    },

    /// Send the full balance report now
    Status,

    /// Print the effective configuration and scheduled jobs
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Run => run_scheduler(&config).await,
        Commands::Check { station } => run_check(&config, station, cli.format).await,
        Commands::Status => run_status(&config, cli.format).await,
        Commands::Config => show_config(&config, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if config.logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_scheduler(config: &Config) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let scheduler = app.scheduler();

    info!(
        network = %config.rpc.network_name,
        env = %config.rpc.env,
        jobs = scheduler.jobs().len(),
        "StationWatch starting"
    );

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;

    Ok(())
}

async fn run_check(
    config: &Config,
    station: Option<StationKind>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::from_config(config)?;

    let monitors: Vec<_> = match station {
        Some(kind) => vec![app
            .monitor(kind)
            .ok_or_else(|| anyhow::anyhow!("station '{kind}' is not configured"))?
            .clone()],
        None => app.monitors().to_vec(),
    };

    let mut reports = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let report = monitor.run_cycle().await;
        reports.push((monitor.kind().to_string(), report));
    }

    print_reports(&reports, format)
}

async fn run_status(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let report = app.reporter().run_cycle().await;
    print_reports(&[("status".to_string(), report)], format)
}

fn show_config(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let jobs = app.scheduler().jobs();
    let warnings = config.warnings();

    if format == OutputFormat::Json {
        let jobs: Vec<_> = jobs
            .iter()
            .map(|job| {
                serde_json::json!({
                    "name": job.name,
                    "every": humantime::format_duration(job.every).to_string(),
                    "immediate": job.immediate,
                })
            })
            .collect();
        let out = serde_json::json!({
            "config": config.redacted(),
            "jobs": jobs,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    println!();
    println!("Scheduled jobs:");
    for job in jobs {
        let first = if job.immediate { "at startup" } else { "after one period" };
        println!(
            "  {:<28} every {:<10} first run {first}",
            job.name,
            humantime::format_duration(job.every).to_string()
        );
    }
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn print_reports(reports: &[(String, CycleReport)], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        let out: Vec<_> = reports
            .iter()
            .map(|(name, report)| {
                let deliveries: Vec<_> = report
                    .deliveries
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "subject": d.subject,
                            "title": d.title,
                            "outcome": d.outcome,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "job": name,
                    "evaluated": report.evaluated,
                    "skipped": report.skipped,
                    "deliveries": deliveries,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (name, report) in reports {
        println!(
            "{name}: {} evaluated, {} skipped, {} sent",
            report.evaluated,
            report.skipped,
            report.alerted()
        );
        for delivery in &report.deliveries {
            let channels: Vec<_> = delivery
                .outcome
                .iter()
                .map(|(provider, ok)| format!("{provider}={}", if *ok { "ok" } else { "failed" }))
                .collect();
            println!("  {} {}: {}", delivery.subject, delivery.title, channels.join(", "));
        }
    }
    Ok(())
}
