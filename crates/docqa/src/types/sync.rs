//! Folder synchronization reports

use serde::{Deserialize, Serialize};

/// A file that could not be ingested during a sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedFile {
    pub file: String,
    pub error: String,
}

/// Result of `POST /sync/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: String,
    pub total_files_in_folder: usize,
    pub new_files_processed: usize,
    pub already_processed: usize,
    pub failed: usize,
    /// Filenames ingested by this sync
    pub processed_files: Vec<String>,
    pub failed_files: Vec<FailedFile>,
    /// Seconds
    pub processing_time: f64,
}

/// A processed file in the status listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFileEntry {
    pub filename: String,
    pub size: u64,
    pub modified: f64,
    pub processed_at: String,
}

/// A file waiting for the next sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFileEntry {
    pub filename: String,
    pub size: u64,
    pub modified: f64,
}

/// Result of `GET /sync/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub total_files: usize,
    pub processed_count: usize,
    pub pending_count: usize,
    pub processed_files: Vec<ProcessedFileEntry>,
    pub pending_files: Vec<PendingFileEntry>,
}
