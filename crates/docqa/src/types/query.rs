//! Question answering request and response types

use serde::{Deserialize, Serialize};

use super::document::DocumentMetadata;

/// Maximum characters of chunk content echoed back as a source preview
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Question request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Use and extend the shared conversation memory (default: false)
    #[serde(default)]
    pub use_conversation: bool,
}

impl QueryRequest {
    /// Create a new stateless query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            use_conversation: false,
        }
    }

    /// Answer in the context of earlier turns
    pub fn with_conversation(mut self) -> Self {
        self.use_conversation = true;
        self
    }
}

/// A retrieved chunk as shown to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Content preview; longer content is cut to [`SOURCE_PREVIEW_CHARS`] plus `...`
    pub content: String,
    /// Source file path
    pub source: String,
    /// Page number if the source was paginated
    pub page: Option<u32>,
}

impl SourceRef {
    /// Build a preview from a chunk's content and metadata
    pub fn preview(content: &str, metadata: &DocumentMetadata) -> Self {
        let preview = if content.chars().count() > SOURCE_PREVIEW_CHARS {
            let mut cut: String = content.chars().take(SOURCE_PREVIEW_CHARS).collect();
            cut.push_str("...");
            cut
        } else {
            content.to_string()
        };
        Self {
            content: preview,
            source: metadata.source.clone(),
            page: metadata.page,
        }
    }
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was grounded on
    pub sources: Vec<SourceRef>,
    /// Wall-clock seconds spent answering
    pub processing_time: f64,
}
