//! Vector store implementations
//!
//! Both stores do an exact cosine scan; the corpus sizes this service targets
//! do not need an approximate index.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::{SqliteIndex, SqliteVectorStore, DB_FILENAME};

use std::sync::Arc;

use crate::config::{VectorStoreBackend, VectorStoreConfig};
use crate::error::Result;
use crate::providers::{VectorSearchResult, VectorStoreProvider};

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Best `k` results, highest similarity first
pub(crate) fn top_k(mut scored: Vec<VectorSearchResult>, k: usize) -> Vec<VectorSearchResult> {
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(k);
    scored
}

/// Open the configured vector store
pub fn build_vector_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStoreProvider>> {
    let store: Arc<dyn VectorStoreProvider> = match config.backend {
        VectorStoreBackend::Sqlite => Arc::new(SqliteVectorStore::open(&config.persist_directory)?),
        VectorStoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; the index is lost on restart");
            Arc::new(MemoryVectorStore::new())
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
