//! Upload retention endpoints

use axum::{extract::State, Json};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::tracking::FileStats;
use crate::types::CleanupResponse;

/// GET /files/stats - Upload directory size and age report
pub async fn file_stats(State(state): State<AppState>) -> Result<Json<FileStats>> {
    let retention = state.retention().clone();
    let stats = tokio::task::spawn_blocking(move || retention.file_stats())
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
    Ok(Json(stats))
}

/// POST /files/cleanup - Delete uploads past the retention window
pub async fn cleanup_files(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let deleted = run_cleanup(&state).await?;
    let retention_days = state.retention().retention_days();

    Ok(Json(CleanupResponse {
        message: format!(
            "Deleted {} files older than {} days",
            deleted.len(),
            retention_days
        ),
        deleted_files: deleted.iter().map(|p| p.display().to_string()).collect(),
        retention_days,
    }))
}

/// Delete expired uploads and drop their ledger records
pub async fn run_cleanup(state: &AppState) -> Result<Vec<PathBuf>> {
    let retention = state.retention().clone();
    let deleted = tokio::task::spawn_blocking(move || retention.cleanup_old_files())
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

    if !deleted.is_empty() {
        state
            .ledger()
            .forget(deleted.iter().map(|p| p.as_path()))
            .await;
        tracing::info!("Retention cleanup removed {} files", deleted.len());
    }
    Ok(deleted)
}
