//! docqa: document question answering over uploaded files
//!
//! Files are loaded per extension, split into overlapping chunks, embedded
//! and stored in a vector index. Questions are answered by retrieving the
//! closest chunks and asking an LLM to answer from them. A JSON ledger in the
//! upload directory tracks which files have been ingested, and a retention
//! manager removes old uploads.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod storage;
pub mod tracking;
pub mod types;

pub use agent::{AgentAnswer, QaAgent};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{DocumentLoader, FolderSync, IngestPipeline};
pub use tracking::{ProcessedLedger, RetentionManager};
pub use types::{
    document::{Chunk, DocumentMetadata, FileType, SourceDocument},
    query::{QueryRequest, QueryResponse},
};
