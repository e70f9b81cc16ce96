//! SQLite-backed vector store
//!
//! Chunks and their embeddings live in one table; embeddings are stored as
//! little-endian f32 blobs. Search is a flat cosine scan over every row.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{VectorSearchResult, VectorStoreProvider};
use crate::types::{Chunk, DocumentMetadata};

use super::{cosine_similarity, top_k};

/// Database file name inside the persist directory
pub const DB_FILENAME: &str = "chunks.sqlite3";

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Synchronous chunk index over a single SQLite connection
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Create or open the index under `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(DB_FILENAME))
            .map_err(|e| Error::vector_store(format!("Failed to open database: {}", e)))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        Self::from_connection(conn)
    }

    /// Non-persistent index, mainly for tests
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                page INTEGER,
                row_num INTEGER,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chunks
                 (id, source, page, row_num, chunk_index, content, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let now = Utc::now().to_rfc3339();
            for chunk in chunks {
                if chunk.embedding.is_empty() {
                    return Err(Error::vector_store(format!(
                        "Chunk {} has no embedding",
                        chunk.id
                    )));
                }
                stmt.execute(params![
                    chunk.id.to_string(),
                    chunk.metadata.source,
                    chunk.metadata.page,
                    chunk.metadata.row,
                    chunk.chunk_index,
                    chunk.content,
                    encode_embedding(&chunk.embedding),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorSearchResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, source, page, row_num, chunk_index, content, embedding FROM chunks",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                DocumentMetadata {
                    source: row.get(1)?,
                    page: row.get(2)?,
                    row: row.get(3)?,
                },
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Vec<u8>>(6)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, metadata, chunk_index, content, blob) = row?;
            let embedding = decode_embedding(&blob);
            let similarity = cosine_similarity(query, &embedding);
            let id = Uuid::parse_str(&id)
                .map_err(|e| Error::vector_store(format!("Corrupt chunk id {}: {}", id, e)))?;

            scored.push(VectorSearchResult {
                chunk: Chunk {
                    id,
                    content,
                    embedding,
                    metadata,
                    chunk_index,
                },
                similarity,
            });
        }

        Ok(top_k(scored, k))
    }

    pub fn delete_by_source(&self, source: &str) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM chunks WHERE source = ?1", params![source])?)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

/// Async vector store over [`SqliteIndex`]; queries run on the blocking pool
pub struct SqliteVectorStore {
    index: Arc<SqliteIndex>,
}

impl SqliteVectorStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let index = SqliteIndex::open(dir)?;
        tracing::info!(
            "Opened vector store at {} ({} chunks)",
            dir.join(DB_FILENAME).display(),
            index.len()?
        );
        Ok(Self {
            index: Arc::new(index),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            index: Arc::new(SqliteIndex::in_memory()?),
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

#[async_trait]
impl VectorStoreProvider for SqliteVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let index = self.index.clone();
        let chunks = chunks.to_vec();
        blocking(move || index.insert_chunks(&chunks)).await
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let index = self.index.clone();
        let query = query_embedding.to_vec();
        blocking(move || index.search(&query, top_k)).await
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let index = self.index.clone();
        let source = source.to_string();
        blocking(move || index.delete_by_source(&source)).await
    }

    async fn len(&self) -> Result<usize> {
        let index = self.index.clone();
        blocking(move || index.len()).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.len().await.is_ok())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
