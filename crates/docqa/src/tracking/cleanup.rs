//! Retention cleanup for the upload directory

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::LEDGER_FILENAME;
use crate::error::Result;

const SECS_PER_DAY: u64 = 86_400;

/// Counts of uploads per age bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeBuckets {
    #[serde(rename = "0-7_days")]
    pub up_to_week: usize,
    #[serde(rename = "8-30_days")]
    pub up_to_month: usize,
    #[serde(rename = "30+_days")]
    pub older: usize,
}

/// Storage report for the upload directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub total_files: usize,
    /// Rounded to two decimals
    pub total_size_mb: f64,
    pub files_by_age: AgeBuckets,
    pub retention_days: u64,
}

/// Deletes uploads older than the retention window
#[derive(Debug, Clone)]
pub struct RetentionManager {
    upload_dir: PathBuf,
    retention_days: u64,
}

impl RetentionManager {
    pub fn new(upload_dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            retention_days,
        }
    }

    pub fn retention_days(&self) -> u64 {
        self.retention_days
    }

    /// Delete a single file. Returns false if it did not exist or removal failed.
    pub fn delete_file_immediately(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Deleted file: {}", path.display());
                true
            }
            Err(e) => {
                tracing::error!("Error deleting {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Delete expired uploads relative to the current time
    pub fn cleanup_old_files(&self) -> Result<Vec<PathBuf>> {
        self.cleanup_old_files_at(SystemTime::now())
    }

    /// Delete every regular file directly in the upload directory whose mtime
    /// is strictly older than `now - retention_days`. The ledger is never removed.
    pub fn cleanup_old_files_at(&self, now: SystemTime) -> Result<Vec<PathBuf>> {
        // A window too large to represent keeps everything
        let cutoff = self
            .retention_days
            .checked_mul(SECS_PER_DAY)
            .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut deleted = Vec::new();
        for (path, meta) in self.upload_files()? {
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if modified >= cutoff {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Cleaned up old file: {}", path.display());
                    deleted.push(path);
                }
                Err(e) => tracing::error!("Error deleting {}: {}", path.display(), e),
            }
        }

        if !deleted.is_empty() {
            tracing::info!(
                "Retention cleanup removed {} files older than {} days",
                deleted.len(),
                self.retention_days
            );
        }
        Ok(deleted)
    }

    /// Report file count, total size and age distribution
    pub fn file_stats(&self) -> Result<FileStats> {
        self.file_stats_at(SystemTime::now())
    }

    pub fn file_stats_at(&self, now: SystemTime) -> Result<FileStats> {
        let files = self.upload_files()?;
        let total_size: u64 = files.iter().map(|(_, m)| m.len()).sum();

        let mut buckets = AgeBuckets::default();
        for (_, meta) in &files {
            let age_days = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .map(|d| d.as_secs_f64() / SECS_PER_DAY as f64)
                .unwrap_or(0.0);

            if age_days <= 7.0 {
                buckets.up_to_week += 1;
            } else if age_days <= 30.0 {
                buckets.up_to_month += 1;
            } else {
                buckets.older += 1;
            }
        }

        let size_mb = total_size as f64 / 1024.0 / 1024.0;
        Ok(FileStats {
            total_files: files.len(),
            total_size_mb: (size_mb * 100.0).round() / 100.0,
            files_by_age: buckets,
            retention_days: self.retention_days,
        })
    }

    /// Regular files directly in the upload directory, ledger excluded
    fn upload_files(&self) -> Result<Vec<(PathBuf, std::fs::Metadata)>> {
        if !self.upload_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.upload_dir)? {
            let entry = entry?;
            if entry.file_name() == LEDGER_FILENAME {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                files.push((entry.path(), meta));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}
