//! Loaded documents and indexed chunks

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, one loaded document per page
    Pdf,
    /// Plain text file
    Txt,
    /// Microsoft Word document (.docx)
    Docx,
    /// Legacy Word extension. Only readable when the file is really OOXML.
    Doc,
    /// Markdown file
    Markdown,
    /// CSV file, one loaded document per row
    Csv,
    /// JSON file
    Json,
}

/// Extensions accepted for ingestion, with the leading dot
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".docx", ".doc", ".md", ".csv", ".json"];

impl FileType {
    /// Detect file type from extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "md" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path of the source file
    pub source: String,
    /// 0-based page number for PDFs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 0-based row number for CSVs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
}

impl DocumentMetadata {
    pub fn file(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
            row: None,
        }
    }

    pub fn row(source: impl Into<String>, row: u32) -> Self {
        Self {
            source: source.into(),
            page: None,
            row: Some(row),
        }
    }
}

/// Text produced by a loader, before splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl SourceDocument {
    pub fn new(page_content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector, filled in before insertion
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Inherited from the source document
    pub metadata: DocumentMetadata,
    /// Chunk index within its source document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(content: String, metadata: DocumentMetadata, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            embedding: Vec::new(),
            metadata,
            chunk_index,
        }
    }
}
