//! Upload bookkeeping: which files were ingested and when uploads expire

pub mod cleanup;
pub mod ledger;

pub use cleanup::{AgeBuckets, FileStats, RetentionManager};
pub use ledger::{ledger_key, FileInfo, FileStat, LedgerEntries, ProcessedLedger};
