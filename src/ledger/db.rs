//! Ledger trait and SQLite implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};

use super::error::LedgerError;
use super::schema;
use super::types::{FailureRecord, LedgerSummary, RunStats, TransferRecord};

/// How long a writer waits on another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable record of completed transfers.
///
/// Object-safe so it can be shared as `Arc<dyn TransferLedger>` between
/// concurrent asset tasks.
#[async_trait]
pub trait TransferLedger: Send + Sync {
    /// Every source URL that has been recorded. Read once at the start of a run.
    async fn transferred_source_urls(&self) -> Result<HashSet<String>, LedgerError>;

    /// Persist a completed transfer before returning.
    ///
    /// Recording a source URL that is already present keeps the first record.
    async fn record(&self, record: &TransferRecord) -> Result<(), LedgerError>;

    async fn record_failure(&self, failure: &FailureRecord) -> Result<(), LedgerError>;

    /// All transfers, oldest first.
    async fn transfers(&self) -> Result<Vec<TransferRecord>, LedgerError>;

    /// Failures whose source URL has not been transferred since, newest first.
    async fn unresolved_failures(&self) -> Result<Vec<FailureRecord>, LedgerError>;

    async fn start_run(&self) -> Result<i64, LedgerError>;

    async fn complete_run(&self, run_id: i64, stats: &RunStats) -> Result<(), LedgerError>;

    async fn summary(&self) -> Result<LedgerSummary, LedgerError>;
}

pub struct SqliteLedger {
    /// rusqlite::Connection is not Sync; the mutex also serializes writers.
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Open or create the ledger, creating its parent directory if needed.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path_clone.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| LedgerError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }

            let conn = Connection::open(&path_clone).map_err(|e| LedgerError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            conn.pragma_update(None, "journal_mode", "WAL")?;
            // FULL: a record must survive power loss once `record` returns.
            conn.pragma_update(None, "synchronous", "FULL")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;

            schema::migrate(&conn)?;

            Ok::<_, LedgerError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(|e| LedgerError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Query(e.to_string()))
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

fn count(conn: &Connection, sql: &str) -> Result<u64, LedgerError> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n as u64)
        .map_err(LedgerError::query)
}

#[async_trait]
impl TransferLedger for SqliteLedger {
    async fn transferred_source_urls(&self) -> Result<HashSet<String>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT source_url FROM transfers")
            .map_err(LedgerError::query)?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(LedgerError::query)?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(LedgerError::query)?;
        Ok(urls)
    }

    async fn record(&self, record: &TransferRecord) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO transfers (source_url, destination_url, collection, title, thumbnail_url, transferred_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &record.source_url,
                    &record.destination_url,
                    &record.collection,
                    &record.title,
                    &record.thumbnail_url,
                    record.transferred_at.timestamp(),
                ],
            )
            .map_err(LedgerError::query)?;
        if inserted == 0 {
            tracing::warn!(
                source_url = %record.source_url,
                "Source already recorded, keeping the earlier transfer"
            );
        }
        Ok(())
    }

    async fn record_failure(&self, failure: &FailureRecord) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO failures (source_url, title, error, failed_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                &failure.source_url,
                &failure.title,
                &failure.error,
                failure.failed_at.timestamp(),
            ],
        )
        .map_err(LedgerError::query)?;
        Ok(())
    }

    async fn transfers(&self) -> Result<Vec<TransferRecord>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT source_url, destination_url, collection, title, thumbnail_url, transferred_at FROM transfers ORDER BY transferred_at, rowid",
            )
            .map_err(LedgerError::query)?;
        let records = stmt
            .query_map([], |row| {
                Ok(TransferRecord {
                    source_url: row.get(0)?,
                    destination_url: row.get(1)?,
                    collection: row.get(2)?,
                    title: row.get(3)?,
                    thumbnail_url: row.get(4)?,
                    transferred_at: timestamp_to_datetime(row.get(5)?),
                })
            })
            .map_err(LedgerError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::query)?;
        Ok(records)
    }

    async fn unresolved_failures(&self) -> Result<Vec<FailureRecord>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT source_url, title, error, failed_at FROM failures \
                 WHERE source_url NOT IN (SELECT source_url FROM transfers) \
                 ORDER BY failed_at DESC, id DESC",
            )
            .map_err(LedgerError::query)?;
        let records = stmt
            .query_map([], |row| {
                Ok(FailureRecord {
                    source_url: row.get(0)?,
                    title: row.get(1)?,
                    error: row.get(2)?,
                    failed_at: timestamp_to_datetime(row.get(3)?),
                })
            })
            .map_err(LedgerError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::query)?;
        Ok(records)
    }

    async fn start_run(&self) -> Result<i64, LedgerError> {
        let started_at = Utc::now().timestamp();
        let conn = self.lock()?;
        conn.execute("INSERT INTO runs (started_at) VALUES (?1)", [started_at])
            .map_err(LedgerError::query)?;
        Ok(conn.last_insert_rowid())
    }

    async fn complete_run(&self, run_id: i64, stats: &RunStats) -> Result<(), LedgerError> {
        let completed_at = Utc::now().timestamp();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET completed_at = ?1, assets_seen = ?2, transferred = ?3, skipped = ?4, failed = ?5 WHERE id = ?6",
            rusqlite::params![
                completed_at,
                stats.assets_seen as i64,
                stats.transferred as i64,
                stats.skipped as i64,
                stats.failed as i64,
                run_id,
            ],
        )
        .map_err(LedgerError::query)?;
        Ok(())
    }

    async fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let conn = self.lock()?;

        let transfers = count(&conn, "SELECT COUNT(*) FROM transfers")?;
        let failures = count(&conn, "SELECT COUNT(*) FROM failures")?;
        let unresolved_failures = count(
            &conn,
            "SELECT COUNT(DISTINCT source_url) FROM failures WHERE source_url NOT IN (SELECT source_url FROM transfers)",
        )?;

        type RunRow = (i64, Option<i64>, i64, i64, i64, i64);
        let last_run: Option<RunRow> = conn
            .query_row(
                "SELECT started_at, completed_at, assets_seen, transferred, skipped, failed FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(LedgerError::query)?;

        let (last_run_started, last_run_completed, last_run_stats) = match last_run {
            Some((started, completed, seen, transferred, skipped, failed)) => (
                Some(timestamp_to_datetime(started)),
                completed.map(timestamp_to_datetime),
                completed.map(|_| RunStats {
                    assets_seen: seen as u64,
                    transferred: transferred as u64,
                    skipped: skipped as u64,
                    failed: failed as u64,
                }),
            ),
            None => (None, None, None),
        };

        Ok(LedgerSummary {
            transfers,
            failures,
            unresolved_failures,
            last_run_started,
            last_run_completed,
            last_run_stats,
        })
    }
}
