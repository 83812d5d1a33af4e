use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "vimeo-bunny-migrate",
    version,
    about = "Copy Vimeo folders into a Bunny Stream library"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments for the default `migrate` command
    #[command(flatten)]
    pub migrate: MigrateArgs,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

impl Cli {
    /// The subcommand to run; `migrate` when none was given.
    pub fn effective_command(self) -> Command {
        self.command
            .unwrap_or(Command::Migrate(Box::new(self.migrate)))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Transfer every in-scope video not yet in the ledger (default)
    Migrate(Box<MigrateArgs>),
    /// Print the source folders that match the scope
    ListFolders(ListFoldersArgs),
    /// Show ledger counts and the last run
    Status(StatusArgs),
    /// Write all transfer records as JSON
    Export(ExportArgs),
}

/// Source account and folder scope.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Vimeo API access token
    #[arg(long, env = "VIMEO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Vimeo user id whose folders are listed
    #[arg(long, env = "VIMEO_USER_ID")]
    pub user_id: Option<String>,

    /// Folder listing path, overriding the one derived from --user-id
    #[arg(long, env = "VIMEO_FOLDERS_PATH")]
    pub folders_path: Option<String>,

    /// Only migrate this folder and everything nested below it
    #[arg(long, env = "VIMEO_SOURCE_FOLDER")]
    pub source_folder: Option<String>,

    /// Require this name among the matched folder's ancestors
    #[arg(long, env = "VIMEO_SOURCE_PARENT")]
    pub source_parent: Option<String>,

    /// Vimeo API root
    #[arg(long, env = "VIMEO_API_BASE", default_value = "https://api.vimeo.com")]
    pub vimeo_api_base: String,

    /// Per-request timeout for API calls, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Retries for a failed listing request (server error or rate limit)
    #[arg(long, default_value_t = 1)]
    pub listing_retries: u32,

    /// Pause after a listing server error, in seconds
    #[arg(long, default_value_t = 30)]
    pub server_error_delay: u64,

    /// Pause after a listing rate limit, in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_limit_delay: u64,
}

#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Path of the transfer ledger database
    #[arg(
        long,
        env = "MIGRATE_LEDGER",
        default_value = "~/.vimeo-bunny-migrate/ledger.db"
    )]
    pub ledger: String,
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Bunny Stream library API key
    #[arg(long, env = "BUNNY_API_KEY", hide_env_values = true)]
    pub bunny_api_key: Option<String>,

    /// Bunny Stream library id
    #[arg(long, env = "BUNNY_LIBRARY_ID")]
    pub bunny_library_id: Option<String>,

    /// Pull zone hostname used to build thumbnail URLs
    #[arg(long, env = "BUNNY_CDN_HOSTNAME")]
    pub bunny_cdn_hostname: Option<String>,

    /// Bunny Stream API root
    #[arg(long, env = "BUNNY_API_BASE", default_value = "https://video.bunnycdn.com")]
    pub bunny_api_base: String,

    /// Host of the embeddable player
    #[arg(long, default_value = "iframe.mediadelivery.net")]
    pub playback_domain: String,

    /// Directory for videos in transit
    #[arg(long, env = "MIGRATE_SCRATCH_DIR", default_value = "videos")]
    pub scratch_dir: String,

    /// Videos transferred in parallel within one listing page
    #[arg(
        long,
        env = "MIGRATE_CONCURRENCY",
        default_value_t = 10,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,

    /// Download attempts per video
    #[arg(long, default_value_t = 3)]
    pub download_attempts: u32,

    /// Pause between download attempts, in seconds
    #[arg(long, default_value_t = 10)]
    pub download_retry_delay: u64,

    /// Timeout for each read while streaming a video, in seconds
    #[arg(long, default_value_t = 60)]
    pub read_timeout: u64,

    /// List what would be transferred without downloading, uploading or
    /// touching the ledger
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}

#[derive(Args, Debug)]
pub struct ListFoldersArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// List failed videos that have not been transferred since
    #[arg(long)]
    pub failed: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Output file, or `-` for stdout
    #[arg(short, long)]
    pub output: PathBuf,
}
