//! Migration orchestrator.
//!
//! Discovery is sequential: the folder walk hands over one page of a folder's
//! videos at a time. Each page is fanned out to at most `concurrency` asset
//! tasks (download, resolve collection, upload, record), and every task of
//! the page finishes before the next page is requested. An asset task's
//! failure is logged and counted; a discovery failure ends the run.

pub mod error;

use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

pub use error::{MigrateError, TransferError};

use crate::bunny::{CollectionResolver, UploadedVideo, Uploader};
use crate::download::Downloader;
use crate::ledger::{FailureRecord, RunStats, TransferLedger, TransferRecord};
use crate::vimeo::{
    FolderScope, FolderWalker, RemoteAsset, RemoteFolder, SourceError, SourceSession,
    select_rendition,
};

/// Subset of application config consumed by the orchestrator.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub folders_path: String,
    pub scope: FolderScope,
    pub scratch_dir: PathBuf,
    pub concurrency: usize,
    pub no_progress_bar: bool,
}

/// Everything a real transfer needs beyond discovery.
pub struct Pipeline {
    pub library_id: String,
    pub ledger: Arc<dyn TransferLedger>,
    pub downloader: Arc<dyn Downloader>,
    pub resolver: CollectionResolver,
    pub uploader: Uploader,
}

pub enum Mode {
    Transfer(Pipeline),
    /// Walk and select renditions only. The ledger is not read, so assets
    /// transferred by earlier runs are listed too.
    Preview,
}

/// What happened to one asset.
#[derive(Debug)]
enum Outcome {
    Transferred(UploadedVideo),
    Skipped,
    Previewed { rendition: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub folders_matched: u64,
    pub folders_skipped: u64,
    pub assets_seen: u64,
    pub transferred: u64,
    pub skipped: u64,
    pub previewed: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl RunReport {
    fn stats(&self) -> RunStats {
        RunStats {
            assets_seen: self.assets_seen,
            transferred: self.transferred,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

pub struct Migrator {
    config: MigrateConfig,
    session: Arc<dyn SourceSession>,
    mode: Mode,
}

impl Migrator {
    pub fn new(config: MigrateConfig, session: Arc<dyn SourceSession>, mode: Mode) -> Self {
        Self {
            config,
            session,
            mode,
        }
    }

    pub async fn run(&self) -> Result<RunReport, MigrateError> {
        let started = Instant::now();

        let (transferred, run_id) = match &self.mode {
            Mode::Transfer(pipeline) => {
                let urls = pipeline.ledger.transferred_source_urls().await?;
                tracing::info!("{} videos already recorded in the ledger", urls.len());
                let run_id = match pipeline.ledger.start_run().await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!("Could not record run start: {}", e);
                        None
                    }
                };
                (urls, run_id)
            }
            Mode::Preview => {
                tracing::info!("[DRY RUN] Nothing will be downloaded, uploaded or recorded");
                (HashSet::new(), None)
            }
        };
        tracing::info!(
            "Migrating {} (concurrency: {})",
            self.config.scope.describe(),
            self.config.concurrency
        );

        let pb = create_progress_bar(self.config.no_progress_bar);
        let mut report = RunReport::default();
        let walked = self.discover_and_transfer(&transferred, &pb, &mut report).await;
        pb.finish_and_clear();
        report.elapsed = started.elapsed();

        if let (Mode::Transfer(pipeline), Some(run_id)) = (&self.mode, run_id) {
            if let Err(e) = pipeline.ledger.complete_run(run_id, &report.stats()).await {
                tracing::warn!("Could not record run completion: {}", e);
            }
        }

        walked?;
        self.log_summary(&report);
        Ok(report)
    }

    async fn discover_and_transfer(
        &self,
        transferred: &HashSet<String>,
        pb: &ProgressBar,
        report: &mut RunReport,
    ) -> Result<(), SourceError> {
        let mut walker = FolderWalker::new(
            self.session.clone(),
            self.config.folders_path.clone(),
            self.config.scope.clone(),
        );

        while let Some(page) = walker.next_page().await? {
            report.folders_skipped += page.skipped as u64;
            for folder in page.matching {
                report.folders_matched += 1;
                pb.suspend(|| {
                    tracing::info!(folder = %folder.display_path(), id = %folder.id, "Scanning folder")
                });

                let mut assets = walker.assets(&folder);
                while let Some(asset_page) = assets.next_page().await? {
                    let count = asset_page.assets.len() as u64;
                    report.assets_seen += count;
                    pb.inc_length(count);
                    self.transfer_page(&folder, asset_page.assets, transferred, pb, report)
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Run one page of asset tasks and wait for all of them.
    async fn transfer_page(
        &self,
        folder: &RemoteFolder,
        assets: Vec<RemoteAsset>,
        transferred: &HashSet<String>,
        pb: &ProgressBar,
        report: &mut RunReport,
    ) {
        let collection = folder.name.as_str();
        let results = stream::iter(assets)
            .map(|asset| async move {
                let outcome = self.transfer_asset(collection, &asset, transferred).await;
                (asset, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1));
        tokio::pin!(results);

        while let Some((asset, outcome)) = results.next().await {
            pb.set_message(asset.name.clone());
            match outcome {
                Ok(Outcome::Transferred(video)) => {
                    report.transferred += 1;
                    pb.suspend(|| {
                        tracing::info!("Transferred \"{}\" -> {}", asset.name, video.playback_url)
                    });
                }
                Ok(Outcome::Skipped) => {
                    report.skipped += 1;
                    pb.suspend(|| {
                        tracing::debug!(url = %asset.source_url, "Already transferred \"{}\"", asset.name)
                    });
                }
                Ok(Outcome::Previewed { rendition }) => {
                    report.previewed += 1;
                    pb.suspend(|| {
                        tracing::info!(
                            "[DRY RUN] Would transfer \"{}\" (collection: \"{}\", rendition: {})",
                            asset.name,
                            collection,
                            rendition
                        )
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    pb.suspend(|| {
                        tracing::error!(id = %asset.id, url = %asset.source_url, "Transfer of \"{}\" failed: {}", asset.name, e)
                    });
                    self.record_failure(&asset, &e).await;
                }
            }
            pb.inc(1);
        }
    }

    async fn transfer_asset(
        &self,
        collection: &str,
        asset: &RemoteAsset,
        transferred: &HashSet<String>,
    ) -> Result<Outcome, TransferError> {
        let pipeline = match &self.mode {
            Mode::Preview => {
                let rendition =
                    select_rendition(&asset.renditions).ok_or(TransferError::NoRenditions)?;
                return Ok(Outcome::Previewed {
                    rendition: rendition.label.clone(),
                });
            }
            Mode::Transfer(pipeline) => pipeline,
        };

        if transferred.contains(&asset.source_url) {
            return Ok(Outcome::Skipped);
        }

        let rendition = select_rendition(&asset.renditions).ok_or(TransferError::NoRenditions)?;
        let scratch = self
            .config
            .scratch_dir
            .join(format!("{}.mp4", Uuid::new_v4()));
        let title = format!("{}.mp4", asset.name);

        let uploaded = self
            .download_and_upload(pipeline, collection, &rendition.url, &scratch, &title)
            .await;
        remove_scratch(&scratch).await;
        let video = uploaded?;

        let record = TransferRecord {
            source_url: asset.source_url.clone(),
            destination_url: video.playback_url.clone(),
            collection: collection.to_string(),
            title,
            thumbnail_url: video.thumbnail_url.clone(),
            transferred_at: Utc::now(),
        };
        pipeline
            .ledger
            .record(&record)
            .await
            .map_err(|source| TransferError::Ledger {
                destination_url: video.playback_url.clone(),
                source,
            })?;

        Ok(Outcome::Transferred(video))
    }

    async fn download_and_upload(
        &self,
        pipeline: &Pipeline,
        collection: &str,
        url: &str,
        scratch: &Path,
        title: &str,
    ) -> Result<UploadedVideo, TransferError> {
        let bytes = pipeline.downloader.fetch(url, scratch).await?;
        tracing::debug!(bytes, path = %scratch.display(), "Downloaded rendition");

        let collection_id = pipeline
            .resolver
            .resolve(&pipeline.library_id, collection)
            .await
            .map_err(|source| TransferError::Collection {
                name: collection.to_string(),
                source,
            })?;

        Ok(pipeline
            .uploader
            .upload(&pipeline.library_id, &collection_id, scratch, title)
            .await?)
    }

    async fn record_failure(&self, asset: &RemoteAsset, error: &TransferError) {
        let Mode::Transfer(pipeline) = &self.mode else {
            return;
        };
        let failure = FailureRecord {
            source_url: asset.source_url.clone(),
            title: asset.name.clone(),
            error: error.to_string(),
            failed_at: Utc::now(),
        };
        if let Err(e) = pipeline.ledger.record_failure(&failure).await {
            tracing::warn!("Could not record failure of {}: {}", asset.source_url, e);
        }
    }

    fn log_summary(&self, report: &RunReport) {
        match self.mode {
            Mode::Preview => {
                tracing::info!("── Dry Run Summary ──");
                tracing::info!(
                    "  {} videos would be transferred from {} folders",
                    report.previewed,
                    report.folders_matched
                );
                if report.failed > 0 {
                    tracing::info!("  {} videos have no downloadable rendition", report.failed);
                }
                tracing::info!("  scope: {}", self.config.scope.describe());
            }
            Mode::Transfer(_) => {
                tracing::info!("── Summary ──");
                tracing::info!(
                    "  {} transferred, {} skipped, {} failed, {} total",
                    report.transferred,
                    report.skipped,
                    report.failed,
                    report.assets_seen
                );
                tracing::info!(
                    "  folders: {} matched, {} out of scope",
                    report.folders_matched,
                    report.folders_skipped
                );
                tracing::info!("  elapsed: {}", format_duration(report.elapsed));
            }
        }
    }
}

async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove scratch file {}: {}", path.display(), e),
    }
}

/// Hidden when `--no-progress-bar` is set or stdout is not a TTY. The length
/// grows as asset pages are discovered.
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
