//! File upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::{Path, PathBuf};

use crate::config::LEDGER_FILENAME;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// POST /upload/ - Save files and ingest them in the background
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let upload_dir = state.config().files.upload_directory.clone();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let mut saved = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(raw_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let Some(filename) = sanitize_filename(&raw_name) else {
            return Err(Error::BadRequest(format!("Invalid filename: {:?}", raw_name)));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read {}: {}", filename, e)))?;

        let path = upload_dir.join(&filename);
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());
        saved.push(path);
    }

    if saved.is_empty() {
        return Err(Error::BadRequest("No files provided".to_string()));
    }

    let sync = state.folder_sync().clone();
    let paths: Vec<PathBuf> = saved.clone();
    tokio::spawn(async move {
        sync.ingest_uploaded(&paths).await;
    });

    Ok(Json(UploadResponse {
        message: "Files uploaded and processing started".to_string(),
        files: saved.iter().map(|p| p.display().to_string()).collect(),
    }))
}

/// Keep only the final path component of a client-supplied name.
///
/// Hidden names are refused; the upload directory keeps its ledger as a dotfile.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base.starts_with('.') || base == LEDGER_FILENAME {
        return None;
    }
    Path::new(base)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}
