//! mongo-hash-compare CLI - Compare MongoDB clusters using dbHash digests.

mod logging;

use clap::{Parser, Subcommand};
use mongo_hash_compare::{
    health_check, report, CollectionProbe, CompareError, Config, Orchestrator, ReportFormat,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mongo-hash-compare")]
#[command(about = "Compare two MongoDB clusters using server-side dbHash digests")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source cluster connection string
    #[arg(long, env = "SOURCE_MONGODB_URI", hide_env_values = true)]
    source: Option<String>,

    /// Destination cluster connection string
    #[arg(long, env = "DEST_MONGODB_URI", hide_env_values = true)]
    destination: Option<String>,

    /// Connection timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Shorthand for --verbosity debug (also VERBOSE=true)
    #[arg(short, long)]
    verbose: bool,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare every user database and collection and write a report
    Compare {
        /// Report path [default: mongodb_hash_comparison_<timestamp>.<format>]
        #[arg(short, long, env = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Report format: xlsx or json
        #[arg(long)]
        format: Option<String>,

        /// Per-probe timeout in seconds
        #[arg(long)]
        probe_timeout: Option<u64>,

        /// Collect the clusters one after the other
        #[arg(long)]
        sequential: bool,

        /// Collection digest strategy: batched or individual
        #[arg(long)]
        collection_probe: Option<String>,
    },

    /// Test cluster connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CompareError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose || env_flag("VERBOSE") {
        tracing::Level::DEBUG
    } else {
        logging::parse_level(&cli.verbosity)
    };
    let log_file = logging::init(level, &cli.log_format, cli.log_file.as_deref())
        .map_err(CompareError::Config)?;

    let result = execute(cli).await;

    if let Some(file) = log_file {
        if let Err(e) = file.sync_all() {
            eprintln!("Failed to flush log file: {}", e);
        }
    }
    result
}

async fn execute(cli: Cli) -> Result<(), CompareError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::read(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    // Flags and environment override the file
    if let Some(uri) = cli.source {
        config.source.uri = uri;
    }
    if let Some(uri) = cli.destination {
        config.destination.uri = uri;
    }
    if let Some(secs) = cli.connect_timeout {
        config.compare.connect_timeout_secs = secs;
    }

    match cli.command {
        Commands::Compare {
            output,
            format,
            probe_timeout,
            sequential,
            collection_probe,
        } => {
            if let Some(path) = output {
                config.report.output = Some(path);
            }
            if let Some(format) = format {
                config.report.format = format.parse::<ReportFormat>()?;
            }
            if let Some(secs) = probe_timeout {
                config.compare.probe_timeout_secs = secs;
            }
            if sequential {
                config.compare.parallel_clusters = false;
            }
            if let Some(mode) = collection_probe {
                config.compare.collection_probe = mode.parse::<CollectionProbe>()?;
            }
            config.validate()?;

            info!(
                "Comparing {} -> {}",
                config.source.display_host(),
                config.destination.display_host()
            );

            let path = config.output_path(chrono::Local::now());
            let sink = report::sink_for(config.report.format, path);
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.run(sink.as_ref()).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let s = &result.summary;
                println!("\nComparison completed!");
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!(
                    "  Databases: {} ({} mismatched, {} missing, {} unverified)",
                    s.databases.total,
                    s.databases.mismatches,
                    s.databases.missing,
                    s.databases.unverified
                );
                println!(
                    "  Collections: {} ({} mismatched, {} missing, {} unverified)",
                    s.collections.total,
                    s.collections.mismatches,
                    s.collections.missing,
                    s.collections.unverified
                );
                if let Some(ref path) = result.report_path {
                    println!("  Report: {}", path.display());
                }
                println!("  Overall status: {}", result.verdict);
            }
        }

        Commands::HealthCheck => {
            config.validate()?;
            let result = health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source ({}): {} ({}ms)",
                    config.source.display_host(),
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Destination ({}): {} ({}ms)",
                    config.destination.display_host(),
                    if result.destination_connected { "OK" } else { "FAILED" },
                    result.destination_latency_ms
                );
                if let Some(ref err) = result.destination_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                warn!("Health check failed");
                let cluster = if result.source_connected { "destination" } else { "source" };
                return Err(CompareError::connection(cluster, "health check failed"));
            }
        }
    }

    Ok(())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
