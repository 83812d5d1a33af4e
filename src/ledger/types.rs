//! Records stored in the ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One completed transfer. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub source_url: String,
    pub destination_url: String,
    pub collection: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub transferred_at: DateTime<Utc>,
}

/// An asset task that failed. Audit only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub source_url: String,
    pub title: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Counters written to the run history when a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub assets_seen: u64,
    pub transferred: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct LedgerSummary {
    pub transfers: u64,
    pub failures: u64,
    /// Distinct source URLs that failed and were never transferred since.
    pub unresolved_failures: u64,
    pub last_run_started: Option<DateTime<Utc>>,
    pub last_run_completed: Option<DateTime<Utc>>,
    pub last_run_stats: Option<RunStats>,
}
