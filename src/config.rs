use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::cli::{LedgerArgs, MigrateArgs, SourceArgs};
use crate::migrate::MigrateConfig;
use crate::retry::RetryConfig;
use crate::vimeo::{FolderScope, ListingRetryPolicy, VimeoClient};

/// Connect timeout for every outbound client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to list the source account.
pub struct SourceConfig {
    pub access_token: String,
    pub api_base: String,
    pub folders_path: String,
    pub scope: FolderScope,
    pub timeout: Duration,
    pub retry: ListingRetryPolicy,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("access_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("folders_path", &self.folders_path)
            .field("scope", &self.scope)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl SourceConfig {
    pub fn from_args(args: SourceArgs) -> anyhow::Result<Self> {
        let access_token = required(args.access_token, "--access-token / VIMEO_ACCESS_TOKEN")?;

        let folders_path = match non_empty(args.folders_path) {
            Some(path) => path,
            None => {
                let user_id = required(args.user_id, "--user-id / VIMEO_USER_ID")?;
                format!("/users/{user_id}/folders?page=1")
            }
        };

        Ok(Self {
            access_token,
            api_base: args.vimeo_api_base,
            folders_path,
            scope: FolderScope::new(args.source_folder, args.source_parent),
            timeout: Duration::from_secs(args.timeout),
            retry: ListingRetryPolicy {
                max_attempts: args.listing_retries.saturating_add(1),
                server_error_delay_secs: args.server_error_delay,
                rate_limit_delay_secs: args.rate_limit_delay,
            },
        })
    }

    pub fn client(&self) -> anyhow::Result<VimeoClient> {
        VimeoClient::new(&self.api_base, &self.access_token, self.timeout, self.retry)
            .context("Failed to build Vimeo client")
    }
}

/// The destination library. Absent in preview mode.
pub struct DestinationConfig {
    pub api_key: String,
    pub library_id: String,
    pub api_base: String,
    pub playback_domain: String,
    pub cdn_hostname: Option<String>,
}

impl std::fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("api_key", &"<redacted>")
            .field("library_id", &self.library_id)
            .field("api_base", &self.api_base)
            .field("playback_domain", &self.playback_domain)
            .field("cdn_hostname", &self.cdn_hostname)
            .finish()
    }
}

/// Validated configuration for a `migrate` run.
#[derive(Debug)]
pub struct Config {
    pub source: SourceConfig,
    pub destination: Option<DestinationConfig>,
    pub ledger_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub download_retry: RetryConfig,
    /// Applies to every JSON API call, on both sides.
    pub api_timeout: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub concurrency: u16,
    pub no_progress_bar: bool,
}

impl Config {
    pub fn from_cli(args: MigrateArgs) -> anyhow::Result<Self> {
        let source = SourceConfig::from_args(args.source)?;
        let api_timeout = source.timeout;

        // Preview never touches the destination, so its credentials are optional.
        let destination = if args.dry_run {
            None
        } else {
            Some(DestinationConfig {
                api_key: required(args.bunny_api_key, "--bunny-api-key / BUNNY_API_KEY")?,
                library_id: required(args.bunny_library_id, "--bunny-library-id / BUNNY_LIBRARY_ID")?,
                api_base: args.bunny_api_base,
                playback_domain: args.playback_domain,
                cdn_hostname: non_empty(args.bunny_cdn_hostname),
            })
        };

        Ok(Self {
            source,
            destination,
            ledger_path: ledger_path(&args.ledger),
            scratch_dir: expand_tilde(&args.scratch_dir),
            download_retry: RetryConfig {
                max_attempts: args.download_attempts,
                delay_secs: args.download_retry_delay,
            },
            api_timeout,
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: Duration::from_secs(args.read_timeout),
            concurrency: args.concurrency,
            no_progress_bar: args.no_progress_bar,
        })
    }

    pub fn migrate_config(&self) -> MigrateConfig {
        MigrateConfig {
            folders_path: self.source.folders_path.clone(),
            scope: self.source.scope.clone(),
            scratch_dir: self.scratch_dir.clone(),
            concurrency: self.concurrency as usize,
            no_progress_bar: self.no_progress_bar,
        }
    }
}

pub fn ledger_path(args: &LedgerArgs) -> PathBuf {
    expand_tilde(&args.ledger)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> anyhow::Result<String> {
    non_empty(value).ok_or_else(|| anyhow::anyhow!("{} is required", name))
}
