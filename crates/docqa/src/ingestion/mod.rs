//! Document ingestion: loading, splitting, embedding and folder sync

mod loader;
mod pipeline;
mod splitter;
mod sync;

pub use loader::DocumentLoader;
pub use pipeline::{IngestOutcome, IngestPipeline};
pub use splitter::{DocumentSplitter, TextSplitter, DEFAULT_SEPARATORS};
pub use sync::{FolderSync, NO_DOCUMENTS_ERROR};
