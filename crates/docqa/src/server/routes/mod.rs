//! API routes for the document QA server

pub mod files;
pub mod query;
pub mod sync;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes.
///
/// Collection endpoints answer with and without a trailing slash.
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload - with larger body limit for file uploads
        .route(
            "/upload/",
            post(upload::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query/", post(query::query_documents))
        .route("/query", post(query::query_documents))
        .route("/clear_memory/", post(query::clear_memory))
        .route("/clear_memory", post(query::clear_memory))
        // Folder sync
        .route("/sync/", post(sync::sync_upload_folder))
        .route("/sync", post(sync::sync_upload_folder))
        .route("/sync/status", get(sync::sync_status))
        // Retention
        .route("/files/stats", get(files::file_stats))
        .route("/files/cleanup", post(files::cleanup_files))
}
