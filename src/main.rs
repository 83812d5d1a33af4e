//! vimeo-bunny-migrate: copy videos from Vimeo folders into a Bunny Stream
//! library.
//!
//! Folders are walked page by page and filtered by scope. The best rendition
//! of each video is downloaded to scratch storage and uploaded into a
//! collection named after its source folder. Every completed transfer is
//! recorded in a SQLite ledger so later runs skip it.

#![warn(clippy::all)]

mod bunny;
mod cli;
mod config;
mod download;
mod ledger;
mod migrate;
pub mod retry;
#[cfg(test)]
mod testing;
mod types;
mod vimeo;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bunny::{BunnyClient, CollectionResolver, StreamApi, Uploader};
use cli::Command;
use download::HttpDownloader;
use ledger::{SqliteLedger, TransferLedger};
use migrate::{Migrator, Mode, Pipeline};
use vimeo::{FolderWalker, SourceSession};

async fn run_migrate(args: cli::MigrateArgs) -> anyhow::Result<()> {
    let config = config::Config::from_cli(args)?;
    tracing::debug!(?config, "Loaded configuration");

    let session: Arc<dyn SourceSession> = Arc::new(config.source.client()?);

    let mode = match &config.destination {
        Some(destination) => {
            tokio::fs::create_dir_all(&config.scratch_dir)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create scratch directory {}",
                        config.scratch_dir.display()
                    )
                })?;

            let ledger = SqliteLedger::open(&config.ledger_path).await?;
            tracing::info!("Using ledger {}", ledger.path().display());

            let api: Arc<dyn StreamApi> = Arc::new(BunnyClient::new(
                &destination.api_base,
                &destination.api_key,
                config.api_timeout,
                config.connect_timeout,
                config.read_timeout,
            )?);
            let downloader = HttpDownloader::new(
                config.connect_timeout,
                config.read_timeout,
                config.download_retry,
            )?;

            Mode::Transfer(Pipeline {
                library_id: destination.library_id.clone(),
                ledger: Arc::new(ledger),
                downloader: Arc::new(downloader),
                resolver: CollectionResolver::new(api.clone()),
                uploader: Uploader::new(
                    api,
                    destination.playback_domain.clone(),
                    destination.cdn_hostname.clone(),
                ),
            })
        }
        None => Mode::Preview,
    };

    let report = Migrator::new(config.migrate_config(), session, mode)
        .run()
        .await?;

    if report.failed > 0 {
        anyhow::bail!(
            "{} of {} videos could not be transferred",
            report.failed,
            report.assets_seen
        );
    }
    Ok(())
}

async fn run_list_folders(args: cli::ListFoldersArgs) -> anyhow::Result<()> {
    let source = config::SourceConfig::from_args(args.source)?;
    let session: Arc<dyn SourceSession> = Arc::new(source.client()?);
    let mut walker = FolderWalker::new(session, source.folders_path.clone(), source.scope.clone());

    println!("Folders matching {}:", source.scope.describe());
    let mut matched = 0usize;
    let mut skipped = 0usize;
    while let Some(page) = walker.next_page().await? {
        skipped += page.skipped;
        for folder in page.matching {
            println!("  {}", folder.display_path());
            matched += 1;
        }
    }

    println!();
    println!("{} matched, {} out of scope", matched, skipped);
    Ok(())
}

async fn run_status(args: cli::StatusArgs) -> anyhow::Result<()> {
    let path = config::ledger_path(&args.ledger);

    if !path.exists() {
        println!("No ledger found at {}", path.display());
        println!("Run a migration first to create it.");
        return Ok(());
    }

    let ledger = SqliteLedger::open(&path).await?;
    let summary = ledger.summary().await?;

    println!("Ledger: {}", path.display());
    println!();
    println!("Transfers: {}", summary.transfers);
    println!(
        "Failures:  {} ({} videos not transferred since)",
        summary.failures, summary.unresolved_failures
    );
    println!();

    if let Some(started) = &summary.last_run_started {
        println!(
            "Last run started:   {}",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    match (&summary.last_run_completed, &summary.last_run_stats) {
        (Some(completed), Some(stats)) => {
            println!(
                "Last run completed: {}",
                completed.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!(
                "  {} seen, {} transferred, {} skipped, {} failed",
                stats.assets_seen, stats.transferred, stats.skipped, stats.failed
            );
        }
        _ if summary.last_run_started.is_some() => {
            println!("Last run did not complete");
        }
        _ => {}
    }

    if args.failed && summary.unresolved_failures > 0 {
        println!();
        println!("Failed videos:");
        for failure in ledger.unresolved_failures().await? {
            println!(
                "  {} ({}) - {}",
                failure.title, failure.source_url, failure.error
            );
        }
    }

    Ok(())
}

async fn run_export(args: cli::ExportArgs) -> anyhow::Result<()> {
    let path = config::ledger_path(&args.ledger);
    if !path.exists() {
        anyhow::bail!("No ledger found at {}", path.display());
    }

    let ledger = SqliteLedger::open(&path).await?;
    let records = ledger.transfers().await?;
    let json = serde_json::to_vec_pretty(&records)?;

    if args.output.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&json)?;
        stdout.write_all(b"\n")?;
    } else {
        tokio::fs::write(&args.output, &json)
            .await
            .with_context(|| format!("Failed to write {}", args.output.display()))?;
        eprintln!(
            "Exported {} transfers to {}",
            records.len(),
            args.output.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenv::dotenv().ok();
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    match cli.effective_command() {
        Command::Migrate(args) => run_migrate(*args).await,
        Command::ListFolders(args) => run_list_folders(args).await,
        Command::Status(args) => run_status(args).await,
        Command::Export(args) => run_export(args).await,
    }
}
