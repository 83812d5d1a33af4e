//! Durable transfer ledger.
//!
//! SQLite-backed record of every completed transfer. The set of recorded
//! source URLs is the dedup key space for later runs; the failure log and
//! run history are kept alongside for `status` reporting.

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use db::{SqliteLedger, TransferLedger};
pub use error::LedgerError;
pub use types::{FailureRecord, RunStats, TransferRecord};
