//! Core types for the document QA service

pub mod document;
pub mod query;
pub mod response;
pub mod sync;

pub use document::{Chunk, DocumentMetadata, FileType, SourceDocument, SUPPORTED_EXTENSIONS};
pub use query::{QueryRequest, QueryResponse, SourceRef};
pub use response::{CleanupResponse, HealthResponse, MessageResponse, UploadResponse};
pub use sync::{
    FailedFile, PendingFileEntry, ProcessedFileEntry, SyncResponse, SyncStatusResponse,
};
