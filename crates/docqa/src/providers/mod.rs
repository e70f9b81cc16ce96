//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Remote services sit behind traits so the pipeline and agent can switch
//! between OpenAI, Anthropic, HuggingFace and a local Ollama server.

pub mod anthropic;
pub mod embedding;
pub mod http;
pub mod huggingface;
pub mod llm;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

use std::sync::Arc;

use crate::config::{EmbeddingBackend, LlmBackend, RagConfig};
use crate::error::Result;

/// Build the configured embedding provider
pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::OpenAi => {
            let client = openai::OpenAiClient::new(&config.llm, config.api_keys.openai.as_deref())?;
            Arc::new(openai::OpenAiEmbedder::new(Arc::new(client), &config.embeddings))
        }
        EmbeddingBackend::HuggingFace => Arc::new(huggingface::HuggingFaceEmbedder::new(
            &config.embeddings,
            &config.llm,
            config.api_keys.huggingface.as_deref(),
        )?),
        EmbeddingBackend::Local => Arc::new(ollama::OllamaEmbedder::new(
            &config.llm,
            config.embeddings.model.clone(),
            config.embeddings.dimensions,
        )?),
    };

    tracing::info!(
        "Embedding provider: {} ({})",
        embedder.name(),
        config.embeddings.model
    );
    Ok(embedder)
}

/// Build the configured LLM provider
pub fn build_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.llm.provider {
        LlmBackend::OpenAi => {
            let client = openai::OpenAiClient::new(&config.llm, config.api_keys.openai.as_deref())?;
            Arc::new(openai::OpenAiChat::new(Arc::new(client), &config.llm))
        }
        LlmBackend::Anthropic => Arc::new(anthropic::AnthropicChat::new(
            &config.llm,
            config.api_keys.anthropic.as_deref(),
        )?),
        LlmBackend::Local => Arc::new(ollama::OllamaLlm::new(&config.llm)?),
    };

    tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());
    Ok(llm)
}
