//! Small response bodies shared by several endpoints

use serde::{Deserialize, Serialize};

/// Body with a single human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of `POST /upload/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Paths the files were saved to
    pub files: Vec<String>,
}

/// Result of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

/// Result of `POST /files/cleanup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_files: Vec<String>,
    pub retention_days: u64,
}
