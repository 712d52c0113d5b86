//! hashsync CLI - incremental uploads of a local tree to an S3 bucket.
//!
//! Every command loads the configuration file, checks that the bucket is
//! reachable and then runs one of the presets described by [`RunMode`].

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hashsync_storage::{create_default_registry, ObjectStore};
use hashsync_sync::{ExclusionSet, RunMode, RunOptions, SyncPlanner, SyncReport};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "hashsync")]
#[command(about = "hashsync - Upload new and changed files to S3-compatible storage")]
#[command(version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "hashsync.toml")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the bucket is reachable.
    Check,

    /// Report which files would be uploaded, without uploading.
    Report,

    /// Upload new and changed files and write the report.
    Upload {
        /// Print per-extension counts after the run.
        #[arg(long)]
        stats: bool,
    },

    /// Upload new and changed files, write the report and print counts.
    Sync,

    /// Run a numbered legacy mode (1-5).
    Mode {
        /// Mode number.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        number: u8,
    },
}

impl Commands {
    fn run_mode(&self) -> Result<RunMode> {
        Ok(match self {
            Commands::Check => RunMode::CheckConnection,
            Commands::Report => RunMode::Report,
            Commands::Upload { stats: false } => RunMode::Upload,
            Commands::Upload { stats: true } => RunMode::UploadWithSummary,
            Commands::Sync => RunMode::Sync,
            Commands::Mode { number } => RunMode::from_legacy(*number)?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mode = cli.command.run_mode()?;
    let config = AppConfig::load(&cli.config).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let store = connect(&config).await?;
    let exclusions = ExclusionSet::load(&config.exclusion_sources());
    let planner = SyncPlanner::new(store, config.sync_config(), exclusions);

    planner
        .check_connection()
        .await
        .context("Bucket connectivity check failed")?;

    match mode.options() {
        None => cmd_check(&config),
        Some(options) => cmd_run(&planner, options, &config.report.path).await,
    }
}

/// Resolve the configured store.
async fn connect(config: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    let registry = create_default_registry();
    registry
        .resolve(&config.store.provider, config.store.settings.clone())
        .await
        .with_context(|| format!("Failed to create store '{}'", config.store.provider))
}

/// Connectivity only.
fn cmd_check(config: &AppConfig) -> Result<()> {
    println!("Connection OK");
    println!("  Provider: {}", config.store.provider);
    println!("  Bucket: {}", config.store.settings.bucket);
    if let Some(endpoint) = &config.store.settings.endpoint {
        println!("  Endpoint: {}", endpoint);
    }
    Ok(())
}

/// Process the tree, persist the report and print the outcome.
async fn cmd_run(
    planner: &SyncPlanner<dyn ObjectStore>,
    options: RunOptions,
    report_path: &Path,
) -> Result<()> {
    let report = planner.run(options).await.context("Run failed")?;

    report
        .persist(report_path)
        .await
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
    info!("Report written to {}", report_path.display());

    print_outcome(&report, options, report_path);
    Ok(())
}

fn print_outcome(report: &SyncReport, options: RunOptions, report_path: &Path) {
    let totals = report.totals();
    let verb = if options.perform_uploads {
        "sent"
    } else {
        "to send"
    };

    println!("Report saved to {}", report_path.display());
    println!(
        "  Files: {} total, {} {}, {} failed",
        totals.total, totals.sent, verb, totals.failed
    );

    if options.print_extension_summary {
        println!("\nBy extension:");
        for (extension, stats) in report.summarize() {
            println!(
                "  {}: {} sent out of {} total",
                extension, stats.sent, stats.total
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_commands_map_to_presets() {
        let cases = [
            (vec!["hashsync", "check"], RunMode::CheckConnection),
            (vec!["hashsync", "report"], RunMode::Report),
            (vec!["hashsync", "upload"], RunMode::Upload),
            (vec!["hashsync", "upload", "--stats"], RunMode::UploadWithSummary),
            (vec!["hashsync", "sync"], RunMode::Sync),
            (vec!["hashsync", "mode", "4"], RunMode::UploadWithSummary),
        ];
        for (args, expected) in cases {
            assert_eq!(parse(&args).command.run_mode().unwrap(), expected);
        }
    }

    #[test]
    fn test_mode_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["hashsync", "mode", "6"]).is_err());
        assert!(Cli::try_parse_from(["hashsync", "mode", "0"]).is_err());
    }

    #[test]
    fn test_config_flag() {
        let cli = parse(&["hashsync", "-c", "/etc/hashsync.toml", "-v", "check"]);
        assert_eq!(cli.config, PathBuf::from("/etc/hashsync.toml"));
        assert!(cli.verbose);

        let cli = parse(&["hashsync", "report"]);
        assert_eq!(cli.config, PathBuf::from("hashsync.toml"));
    }
}
