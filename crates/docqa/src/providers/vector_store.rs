//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity, higher is more similar
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `SqliteVectorStore`: persistent, flat cosine scan
/// - `MemoryVectorStore`: in-process, lost on restart
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert chunks that already carry embeddings
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Top-`top_k` chunks by similarity, best first
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<VectorSearchResult>>;

    /// Delete all chunks loaded from `source`, returning how many were removed
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
