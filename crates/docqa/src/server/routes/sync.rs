//! Upload folder sync endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{SyncResponse, SyncStatusResponse};

/// POST /sync/ - Ingest new or changed files found in the upload directory
pub async fn sync_upload_folder(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    Ok(Json(state.folder_sync().run().await?))
}

/// GET /sync/status - Which files are processed and which are pending
pub async fn sync_status(State(state): State<AppState>) -> Result<Json<SyncStatusResponse>> {
    Ok(Json(state.folder_sync().status().await?))
}
