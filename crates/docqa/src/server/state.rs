//! Application state for the document QA server

use std::sync::Arc;

use crate::agent::QaAgent;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{DocumentSplitter, FolderSync, IngestPipeline};
use crate::providers::{self, EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::storage;
use crate::tracking::{ProcessedLedger, RetentionManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    pipeline: Arc<IngestPipeline>,
    sync: Arc<FolderSync>,
    ledger: Arc<ProcessedLedger>,
    retention: RetentionManager,
    /// The agent, or why it could not be built
    agent: std::result::Result<Arc<QaAgent>, String>,
}

impl AppState {
    /// Build providers from configuration.
    ///
    /// Embedding and vector store failures are fatal. An LLM that cannot be
    /// built leaves the server running with query endpoints answering 503.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing {}...", config.app_name);

        tokio::fs::create_dir_all(&config.files.upload_directory).await?;

        let embedder = providers::build_embedder(&config)?;
        let store = storage::build_vector_store(&config.vector_store)?;
        let llm = match providers::build_llm(&config) {
            Ok(llm) => Some(llm),
            Err(e) => {
                tracing::warn!("AI Agent not initialized: {}", e);
                None
            }
        };

        Self::with_providers(config, embedder, store, llm)
    }

    /// Assemble state around already-built providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        let splitter = DocumentSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let pipeline = Arc::new(IngestPipeline::new(splitter, embedder.clone(), store.clone()));

        let ledger = Arc::new(ProcessedLedger::new(config.files.ledger_path()));
        let sync = Arc::new(FolderSync::new(
            config.files.upload_directory.clone(),
            pipeline.clone(),
            ledger.clone(),
        ));
        let retention = RetentionManager::new(
            config.files.upload_directory.clone(),
            config.files.retention_days,
        );

        let agent = match llm {
            Some(llm) => Ok(Arc::new(QaAgent::new(
                embedder,
                store,
                llm,
                config.vector_store.retriever_k,
                config.conversation.max_turns,
            ))),
            None => Err(format!("no LLM provider available ({:?})", config.llm.provider)),
        };

        if agent.is_ok() {
            tracing::info!("AI Agent ready");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                sync,
                ledger,
                retention,
                agent,
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &Arc<IngestPipeline> {
        &self.inner.pipeline
    }

    pub fn folder_sync(&self) -> &Arc<FolderSync> {
        &self.inner.sync
    }

    pub fn ledger(&self) -> &Arc<ProcessedLedger> {
        &self.inner.ledger
    }

    pub fn retention(&self) -> &RetentionManager {
        &self.inner.retention
    }

    /// The QA agent, or `AgentUnavailable` if it failed to initialize
    pub fn agent(&self) -> Result<&Arc<QaAgent>> {
        self.inner
            .agent
            .as_ref()
            .map_err(|reason| Error::AgentUnavailable(reason.clone()))
    }
}
