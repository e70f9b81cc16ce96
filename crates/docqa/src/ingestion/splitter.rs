//! Recursive character splitting with overlap
//!
//! Text is split on the first separator that occurs in it. Pieces that are
//! still too long are split again with the remaining separators, and short
//! neighbouring pieces are merged back up to `chunk_size` characters with up
//! to `chunk_overlap` characters carried into the next chunk.

use regex::Regex;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{Chunk, FileType, SourceDocument};

/// Separators for plain text, tried in order
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// Regex separators for markdown: headings, code fences, horizontal rules
const MARKDOWN_PATTERNS: &[&str] = &[
    r"\n#{1,6} ",
    r"```\n",
    r"\n\*\*\*+\n",
    r"\n---+\n",
    r"\n___+\n",
];

#[derive(Debug, Clone)]
enum Separator {
    Pattern(Regex),
    /// Split into grapheme clusters
    Graphemes,
}

impl Separator {
    fn literal(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::Graphemes);
        }
        Self::regex(&regex::escape(s))
    }

    fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| Error::internal(format!("Bad separator {:?}: {}", pattern, e)))
    }

    fn occurs_in(&self, text: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Graphemes => true,
        }
    }

    /// Split keeping each separator at the start of the piece that follows it
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Self::Graphemes => text.graphemes(true).collect(),
            Self::Pattern(re) => {
                let mut pieces = Vec::new();
                let mut start = 0;
                for m in re.find_iter(text) {
                    if m.start() > start {
                        pieces.push(&text[start..m.start()]);
                    }
                    start = m.start();
                }
                if start < text.len() {
                    pieces.push(&text[start..]);
                }
                pieces
            }
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive character text splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Separator>,
}

impl TextSplitter {
    /// Splitter for generic text
    pub fn recursive(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let separators = DEFAULT_SEPARATORS
            .iter()
            .map(|s| Separator::literal(s))
            .collect::<Result<Vec<_>>>()?;
        Self::with_separators(chunk_size, chunk_overlap, separators)
    }

    /// Splitter that prefers markdown section boundaries
    pub fn markdown(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let mut separators = MARKDOWN_PATTERNS
            .iter()
            .map(|p| Separator::regex(p))
            .collect::<Result<Vec<_>>>()?;
        for s in ["\n\n", "\n", " ", ""] {
            separators.push(Separator::literal(s)?);
        }
        Self::with_separators(chunk_size, chunk_overlap, separators)
    }

    fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<Separator>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Split text into chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        // First separator present in the text; graphemes always match
        let (index, separator) = match separators.iter().enumerate().find(|(_, s)| s.occurs_in(text)) {
            Some(found) => found,
            None => return self.merge(&[text]),
        };
        let remaining = &separators[index + 1..];

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();

        for piece in separator.split(text) {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short));
                short.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.trim().to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !short.is_empty() {
            chunks.extend(self.merge(&short));
        }
        chunks.retain(|c| !c.is_empty());
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, carrying a tail of at most
    /// `chunk_overlap` characters into the next chunk
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: std::collections::VecDeque<(&str, usize)> = Default::default();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window);
                while total > self.chunk_overlap
                    || (total > 0 && total + len > self.chunk_size)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }

    /// Split documents, copying each document's metadata to its chunks
    pub fn split_documents(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.page_content)
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Chunk::new(text, doc.metadata.clone(), i as u32))
            })
            .collect()
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &std::collections::VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Picks the markdown splitter for `.md` sources and the generic one otherwise
#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    recursive: TextSplitter,
    markdown: TextSplitter,
}

impl DocumentSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self {
            recursive: TextSplitter::recursive(chunk_size, chunk_overlap)?,
            markdown: TextSplitter::markdown(chunk_size, chunk_overlap)?,
        })
    }

    pub fn split_documents_by_type(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                let is_markdown = FileType::from_path(Path::new(&doc.metadata.source))
                    == Some(FileType::Markdown);
                let splitter = if is_markdown { &self.markdown } else { &self.recursive };
                splitter.split_documents(std::slice::from_ref(doc))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = TextSplitter::recursive(100, 10).unwrap();
        assert_eq!(splitter.split_text("  hello world  "), vec!["hello world"]);
        assert!(splitter.split_text("   ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let splitter = TextSplitter::recursive(50, 10).unwrap();
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(20);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "{:?}", chunk);
        }
    }

    #[test]
    fn test_overlap_carries_words() {
        let splitter = TextSplitter::recursive(20, 8).unwrap();
        let chunks = splitter.split_text("one two three four five six seven eight");

        assert!(chunks.len() >= 2);
        // The tail of each chunk reappears at the head of the next one
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].starts_with(last_word), "{:?}", pair);
        }
    }

    #[test]
    fn test_paragraphs_preferred() {
        let splitter = TextSplitter::recursive(30, 0).unwrap();
        let chunks = splitter.split_text("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn test_unbroken_text_split_by_graphemes() {
        let splitter = TextSplitter::recursive(10, 0).unwrap();
        let chunks = splitter.split_text(&"é".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[2].chars().count(), 5);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(TextSplitter::recursive(10, 10).is_err());
        assert!(TextSplitter::recursive(0, 0).is_err());
    }

    #[test]
    fn test_markdown_splits_on_headings() {
        let splitter = TextSplitter::markdown(40, 0).unwrap();
        let text = "# Intro\n\nShort intro text.\n## Usage\n\nRun the binary now.";
        let chunks = splitter.split_text(text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# Intro"));
        assert!(chunks[1].starts_with("## Usage"));
    }

    #[test]
    fn test_split_documents_by_type_keeps_metadata() {
        let splitter = DocumentSplitter::new(1000, 200).unwrap();
        let docs = vec![
            SourceDocument::new("page text", DocumentMetadata::page("/u/report.pdf", 3)),
            SourceDocument::new("# Notes\n\nbody", DocumentMetadata::file("/u/notes.md")),
        ];

        let chunks = splitter.split_documents_by_type(&docs);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.page, Some(3));
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].metadata.source, "/u/notes.md");
    }
}
