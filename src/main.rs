//! Backup Rotator - Main entry point
//!
//! Archives a directory, ships the archive to remote storage, and prunes
//! older remote archives with tiered daily/weekly/monthly retention.

use anyhow::Result;
use backup_rotator::executor::BackupExecutor;
use backup_rotator::ports::TerminalConfirm;
use backup_rotator::tools::{RcloneTransport, TarArchiver};
use backup_rotator::{utils, Config};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source directory to back up (overrides config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Remote destination, e.g. "offsite:backups/host" (overrides config)
    #[arg(short, long)]
    remote: Option<String>,

    /// Backup stream prefix (overrides config)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Delete pruned backups without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = args.config {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    // Apply command-line overrides
    if let Some(source) = args.source {
        config.source.path = source;
    }
    if let Some(remote) = args.remote {
        config.remote.destination = remote;
    }
    if let Some(prefix) = args.prefix {
        config.source.prefix = prefix;
    }
    if args.yes {
        config.remote.auto_confirm = true;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting backup-rotator v{} (destination: {})",
        env!("CARGO_PKG_VERSION"),
        config.remote.destination
    );

    // Fail before any side effect on a bad configuration
    config.validate()?;

    let executor = BackupExecutor::new(TarArchiver, RcloneTransport, TerminalConfirm);
    let today = chrono::Local::now().date_naive();

    let report = executor.execute(&config, today, args.dry_run).await?;

    tracing::info!(
        archive = %report.identifier,
        kept = report.kept,
        eligible = report.eligible,
        deleted = report.deleted,
        failed = report.delete_failures,
        "Backup run complete"
    );

    Ok(())
}
