//! HTTP server for the document QA service

pub mod routes;
pub mod state;

use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::types::HealthResponse;
use state::AppState;

/// Document QA HTTP server
pub struct DocqaServer {
    config: RagConfig,
    state: AppState,
}

impl DocqaServer {
    /// Create a server, building providers from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Start serving. Also starts periodic retention cleanup when configured.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        if let Some(secs) = self.config.files.cleanup_interval_secs.filter(|s| *s > 0) {
            spawn_cleanup_task(self.state.clone(), Duration::from_secs(secs));
        }

        let router = router(self.state.clone());

        tracing::info!("Starting {} on http://{}", self.config.app_name, addr);
        tracing::info!(
            "Upload directory: {}",
            self.config.files.upload_directory.display()
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes
pub fn router(state: AppState) -> Router {
    let max_upload_size = state.config().server.max_upload_size;
    let enable_cors = state.config().server.enable_cors;

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::api_routes(max_upload_size))
        .with_state(state)
        // Middleware layers (order matters - applied bottom to top)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

fn spawn_cleanup_task(state: AppState, every: Duration) {
    tracing::info!(
        "Retention cleanup every {:?} ({} day window)",
        every,
        state.retention().retention_days()
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = routes::files::run_cleanup(&state).await {
                tracing::error!("Scheduled cleanup failed: {}", e);
            }
        }
    });
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
    })
}

/// Welcome and endpoint listing
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": format!("Welcome to {}", state.config().app_name),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /upload/": "Upload documents; processing continues in the background",
            "POST /query/": "Ask a question about the uploaded documents",
            "POST /clear_memory/": "Clear conversation memory",
            "POST /sync/": "Process new or changed files in the upload directory",
            "GET /sync/status": "List processed and pending files",
            "GET /files/stats": "Upload directory size and age report",
            "POST /files/cleanup": "Delete uploads past the retention window",
            "GET /health": "Health check"
        }
    }))
}
