//! In-process vector store

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::providers::{VectorSearchResult, VectorStoreProvider};
use crate::types::Chunk;

use super::{cosine_similarity, top_k};

/// Vector store held entirely in memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryVectorStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.is_empty()) {
            return Err(Error::vector_store(format!("Chunk {} has no embedding", bad.id)));
        }
        self.chunks.write().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<VectorSearchResult>> {
        let scored = self
            .chunks
            .read()
            .iter()
            .map(|chunk| VectorSearchResult {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();
        Ok(top_k(scored, k))
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut chunks = self.chunks.write();
        let before = chunks.len();
        chunks.retain(|c| c.metadata.source != source);
        Ok(before - chunks.len())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn chunk(source: &str, embedding: Vec<f32>) -> Chunk {
        let mut c = Chunk::new(source.to_string(), DocumentMetadata::file(source), 0);
        c.embedding = embedding;
        c
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = MemoryVectorStore::new();
        store
            .insert_chunks(&[chunk("far", vec![0.0, 1.0]), chunk("near", vec![1.0, 0.2])])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 4).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.metadata.source, "near");
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryVectorStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(store.search(&[1.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_source() {
        let store = MemoryVectorStore::new();
        store
            .insert_chunks(&[chunk("a", vec![1.0]), chunk("b", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.delete_by_source("a").await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
