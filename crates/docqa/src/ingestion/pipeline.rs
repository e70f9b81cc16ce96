//! Load, split, embed and index a file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};

use super::loader::DocumentLoader;
use super::splitter::DocumentSplitter;

/// What ingesting one file produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Documents returned by the loader (pages, rows, or whole files)
    pub documents: usize,
    /// Chunks embedded and written to the vector store
    pub chunks: usize,
}

/// Ingestion pipeline shared by uploads and folder sync
pub struct IngestPipeline {
    splitter: DocumentSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl IngestPipeline {
    pub fn new(
        splitter: DocumentSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            splitter,
            embedder,
            store,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Ingest one file.
    ///
    /// A file that loads to zero documents is not an error here; the outcome
    /// reports `documents == 0` and nothing is written. Chunks previously
    /// indexed for the same path are replaced.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome> {
        let start = Instant::now();

        let owned = path.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || DocumentLoader::read_file(&owned))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        if documents.is_empty() {
            return Ok(IngestOutcome::default());
        }

        let mut chunks = self.splitter.split_documents_by_type(&documents);
        if !chunks.is_empty() {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != chunks.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                )));
            }
            for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }

        let source = path.to_string_lossy();
        let replaced = self.store.delete_by_source(&source).await?;
        if replaced > 0 {
            tracing::debug!("Replaced {} stale chunks for {}", replaced, source);
        }
        self.store.insert_chunks(&chunks).await?;

        tracing::info!(
            "Ingested {}: {} documents, {} chunks in {:?}",
            path.display(),
            documents.len(),
            chunks.len(),
            start.elapsed()
        );

        Ok(IngestOutcome {
            documents: documents.len(),
            chunks: chunks.len(),
        })
    }

    /// Ingest several files one after another, collecting per-file results
    pub async fn ingest_files(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<IngestOutcome>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.ingest_file(path).await;
            if let Err(e) = &result {
                tracing::error!("Failed to ingest {}: {}", path.display(), e);
            }
            results.push((path.clone(), result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockEmbedder;
    use crate::storage::MemoryVectorStore;
    use tempfile::TempDir;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(
            DocumentSplitter::new(100, 20).unwrap(),
            Arc::new(MockEmbedder::new(32)),
            Arc::new(MemoryVectorStore::new()),
        )
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "word ".repeat(100)).unwrap();

        let pipeline = pipeline();
        let outcome = pipeline.ingest_file(&path).await.unwrap();

        assert_eq!(outcome.documents, 1);
        assert!(outcome.chunks > 1);
        assert_eq!(pipeline.store().len().await.unwrap(), outcome.chunks);
    }

    #[tokio::test]
    async fn test_reingest_replaces_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "first version").unwrap();

        let pipeline = pipeline();
        pipeline.ingest_file(&path).await.unwrap();
        std::fs::write(&path, "second version").unwrap();
        pipeline.ingest_file(&path).await.unwrap();

        let results = pipeline.store().search(&[0.0; 32], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "second version");
    }

    #[tokio::test]
    async fn test_unsupported_file_ingests_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.png");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let outcome = pipeline().ingest_file(&path).await.unwrap();
        assert_eq!(outcome, IngestOutcome::default());
    }

    #[tokio::test]
    async fn test_ingest_files_collects_errors() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, "hello").unwrap();
        std::fs::write(&bad, "{").unwrap();

        let results = pipeline().ingest_files(&[good, bad]).await;
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }
}
