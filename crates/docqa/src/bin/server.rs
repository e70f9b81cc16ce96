//! Document QA server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server

use docqa::{config::RagConfig, server::DocqaServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RagConfig::load()?;

    let default_filter = if config.debug {
        "docqa=debug,tower_http=debug"
    } else {
        "docqa=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                     Document QA Agent                     ║
║        Upload documents, ask questions, get sources       ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Embeddings: {:?} ({}, {} dims)",
        config.embeddings.provider,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM: {:?} ({})", config.llm.provider, config.llm.model);
    tracing::info!(
        "  - Vector store: {:?} at {}",
        config.vector_store.backend,
        config.vector_store.persist_directory.display()
    );
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - API keys: {:?}", config.api_keys);

    let server = DocqaServer::new(config).await?;

    let embedder = server.state().pipeline().embedder().clone();
    match embedder.health_check().await {
        Ok(true) => tracing::info!("Embedding provider {} is reachable", embedder.name()),
        _ => tracing::warn!(
            "Embedding provider {} is not reachable; uploads will fail until it is",
            embedder.name()
        ),
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload/      - Upload documents");
    println!("  POST /query/       - Ask questions");
    println!("  POST /sync/        - Process files added to the upload directory");
    println!("  GET  /sync/status  - Processed and pending files");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
