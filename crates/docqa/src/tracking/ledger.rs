//! Processed-file ledger
//!
//! A JSON file in the upload directory maps each ingested file's absolute
//! path to the size and modification time it had when it was ingested. A
//! file counts as processed only while both values still match, so editing
//! or replacing a file makes the next sync pick it up again.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::sync::Mutex;

use crate::error::Result;

/// Size and mtime of a file on disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: f64,
}

/// One ledger record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub size: u64,
    pub modified: f64,
    /// ISO-8601 timestamp of ingestion
    pub processed_at: String,
}

/// Ledger contents keyed by absolute file path
pub type LedgerEntries = BTreeMap<String, FileInfo>;

/// Persistent record of which uploads have been ingested
pub struct ProcessedLedger {
    path: PathBuf,
    /// Serializes load-modify-save across concurrent requests
    write_lock: Mutex<()>,
}

impl ProcessedLedger {
    /// Create a ledger backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stat a file for comparison against the ledger
    pub async fn file_info(path: &Path) -> Result<FileStat> {
        let meta = tokio::fs::metadata(path).await?;
        let modified = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Ok(FileStat {
            size: meta.len(),
            modified,
        })
    }

    /// Read the ledger. Missing or corrupt files load as empty.
    pub async fn load(&self) -> LedgerEntries {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LedgerEntries::new(),
            Err(e) => {
                tracing::warn!("Could not read ledger {}: {}", self.path.display(), e);
                return LedgerEntries::new();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Ledger {} is corrupt, starting empty: {}",
                    self.path.display(),
                    e
                );
                LedgerEntries::new()
            }
        }
    }

    /// Write the ledger. Failures are logged, not returned.
    pub async fn save(&self, entries: &LedgerEntries) {
        let json = match serde_json::to_vec_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize ledger: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.path, json).await {
            tracing::error!("Failed to write ledger {}: {}", self.path.display(), e);
        }
    }

    /// True iff `entries` holds a record for `path` whose size and mtime match `stat`
    pub fn is_processed(path: &Path, stat: &FileStat, entries: &LedgerEntries) -> bool {
        entries
            .get(&ledger_key(path))
            .map(|info| info.size == stat.size && info.modified == stat.modified)
            .unwrap_or(false)
    }

    /// Record `path` as ingested with the given stat
    pub async fn record(&self, path: &Path, stat: FileStat) {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await;
        entries.insert(
            ledger_key(path),
            FileInfo {
                size: stat.size,
                modified: stat.modified,
                processed_at: Utc::now().to_rfc3339(),
            },
        );
        self.save(&entries).await;
        tracing::debug!("Ledger: recorded {}", path.display());
    }

    /// Drop records for files that no longer exist
    pub async fn forget<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await;
        let before = entries.len();
        for path in paths {
            entries.remove(&ledger_key(path));
        }
        if entries.len() != before {
            self.save(&entries).await;
            tracing::debug!("Ledger: removed {} records", before - entries.len());
        }
    }
}

/// Ledger keys are paths as strings; callers pass absolute upload paths
pub fn ledger_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_ledger_loads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::new(dir.path().join(".processed_files.json"));
        assert!(ledger.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_ledger_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), ".processed_files.json", "{not json");
        let ledger = ProcessedLedger::new(path);
        assert!(ledger.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_then_processed() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::new(dir.path().join(".processed_files.json"));
        let file = write_file(dir.path(), "a.txt", "hello");

        let stat = ProcessedLedger::file_info(&file).await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(!ProcessedLedger::is_processed(&file, &stat, &ledger.load().await));

        ledger.record(&file, stat).await;
        let entries = ledger.load().await;
        assert!(ProcessedLedger::is_processed(&file, &stat, &entries));
        assert!(!entries[&ledger_key(&file)].processed_at.is_empty());
    }

    #[tokio::test]
    async fn test_size_change_requires_reprocessing() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::new(dir.path().join(".processed_files.json"));
        let file = write_file(dir.path(), "a.txt", "hello");
        let stat = ProcessedLedger::file_info(&file).await.unwrap();
        ledger.record(&file, stat).await;

        // Keep the mtime identical so only the size differs
        let mtime = std::fs::metadata(&file).unwrap().modified().unwrap();
        write_file(dir.path(), "a.txt", "hello, world");
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let fresh = ProcessedLedger::file_info(&file).await.unwrap();
        assert_eq!(fresh.modified, stat.modified);
        assert!(!ProcessedLedger::is_processed(&file, &fresh, &ledger.load().await));
    }

    #[tokio::test]
    async fn test_mtime_change_requires_reprocessing() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::new(dir.path().join(".processed_files.json"));
        let file = write_file(dir.path(), "a.txt", "hello");
        let stat = ProcessedLedger::file_info(&file).await.unwrap();
        ledger.record(&file, stat).await;

        let later = SystemTime::now() + Duration::from_secs(120);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let fresh = ProcessedLedger::file_info(&file).await.unwrap();
        assert_eq!(fresh.size, stat.size);
        assert!(!ProcessedLedger::is_processed(&file, &fresh, &ledger.load().await));
    }

    #[tokio::test]
    async fn test_forget_removes_records() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::new(dir.path().join(".processed_files.json"));
        let a = write_file(dir.path(), "a.txt", "a");
        let b = write_file(dir.path(), "b.txt", "b");
        ledger.record(&a, ProcessedLedger::file_info(&a).await.unwrap()).await;
        ledger.record(&b, ProcessedLedger::file_info(&b).await.unwrap()).await;

        ledger.forget([a.as_path()]).await;
        let entries = ledger.load().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&ledger_key(&b)));
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let ledger = std::sync::Arc::new(ProcessedLedger::new(
            dir.path().join(".processed_files.json"),
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let file = write_file(dir.path(), &format!("f{}.txt", i), "x");
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let stat = ProcessedLedger::file_info(&file).await.unwrap();
                ledger.record(&file, stat).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(ledger.load().await.len(), 8);
    }
}
