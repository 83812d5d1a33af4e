use thiserror::Error;

use crate::bunny::UploadError;
use crate::download::DownloadError;
use crate::ledger::LedgerError;
use crate::vimeo::SourceError;

/// Fatal to a whole run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Discovery failed: {0}")]
    Discovery(#[from] SourceError),

    #[error("Cannot read transfer ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Fatal to one asset only. Caught and logged at the task boundary.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("No downloadable renditions")]
    NoRenditions,

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Cannot resolve collection \"{name}\": {source}")]
    Collection { name: String, source: UploadError },

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    /// The video is live on the destination but the ledger does not know it,
    /// so the next run will transfer it again.
    #[error("Uploaded to {destination_url} but the ledger write failed: {source}")]
    Ledger {
        destination_url: String,
        source: LedgerError,
    },
}
