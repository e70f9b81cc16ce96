//! Per-extension document loaders

use parking_lot::Mutex;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{DocumentMetadata, FileType, SourceDocument};

/// Replace typographic glyphs that PDF fonts commonly emit
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{2010}', "-")
        .replace('\u{2011}', "-")
        .replace('\u{2013}', "-")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Loads files into [`SourceDocument`]s according to their extension.
///
/// Remembers every path it has loaded so repeated folder scans skip them.
#[derive(Default)]
pub struct DocumentLoader {
    loaded: Mutex<HashSet<String>>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one file and remember it for [`load_folder`](Self::load_folder).
    pub fn load_file(&self, path: &Path) -> Result<Vec<SourceDocument>> {
        let docs = Self::read_file(path)?;
        self.loaded.lock().insert(path.to_string_lossy().into_owned());
        Ok(docs)
    }

    /// Load one file without touching the loaded set.
    /// Unsupported extensions yield no documents, not an error.
    pub fn read_file(path: &Path) -> Result<Vec<SourceDocument>> {
        let Some(file_type) = FileType::from_path(path) else {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            tracing::warn!("Unsupported file type: .{} ({})", ext, path.display());
            return Ok(Vec::new());
        };

        let data = std::fs::read(path)?;
        let source = path.to_string_lossy().into_owned();
        Self::parse(&source, file_type, &data)
    }

    /// Load every supported file under `dir`, recursively.
    ///
    /// Per-file failures are logged and skipped. Files this loader has
    /// already loaded are not loaded again.
    pub fn load_folder(&self, dir: &Path) -> Result<Vec<SourceDocument>> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Folder {} does not exist", dir.display()),
            )));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || FileType::from_path(path).is_none() {
                continue;
            }
            if self.loaded.lock().contains(path.to_string_lossy().as_ref()) {
                continue;
            }

            match self.load_file(path) {
                Ok(docs) => {
                    tracing::info!("Loaded {} documents from {}", docs.len(), path.display());
                    documents.extend(docs);
                }
                Err(e) => tracing::error!("Error loading {}: {}", path.display(), e),
            }
        }

        Ok(documents)
    }

    /// Parse raw file bytes of a known type
    pub fn parse(source: &str, file_type: FileType, data: &[u8]) -> Result<Vec<SourceDocument>> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(source, data),
            FileType::Txt => Self::parse_text(source, data),
            FileType::Docx | FileType::Doc => Self::parse_docx(source, data),
            FileType::Markdown => Self::parse_markdown(source, data),
            FileType::Csv => Self::parse_csv(source, data),
            FileType::Json => Self::parse_json(source, data),
        }
    }

    /// One document per page with text, pages numbered from 0
    fn parse_pdf(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let mut docs = Vec::new();

        match lopdf::Document::load_mem(data) {
            Ok(pdf) => {
                for (index, page_number) in pdf.get_pages().keys().enumerate() {
                    match pdf.extract_text(&[*page_number]) {
                        Ok(text) => {
                            let text = cleanup_pdf_text(&text);
                            if !text.is_empty() {
                                docs.push(SourceDocument::new(
                                    text,
                                    DocumentMetadata::page(source, index as u32),
                                ));
                            }
                        }
                        Err(e) => {
                            tracing::debug!("Could not extract page {}: {}", page_number, e)
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("lopdf could not open {}: {}", source, e),
        }

        if docs.is_empty() {
            // Whole-document extraction copes with fonts lopdf cannot map
            let text = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::file_parse(source, format!("PDF extraction failed: {}", e)))?;
            let text = cleanup_pdf_text(&text);
            if !text.is_empty() {
                docs.push(SourceDocument::new(text, DocumentMetadata::page(source, 0)));
            }
        }

        Ok(docs)
    }

    fn parse_text(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::file_parse(source, format!("Invalid UTF-8: {}", e)))?;
        Ok(vec![SourceDocument::new(text, DocumentMetadata::file(source))])
    }

    fn parse_docx(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(source, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            match child {
                                docx_rs::RunChild::Text(t) => content.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => content.push('\t'),
                                docx_rs::RunChild::Break(_) => content.push('\n'),
                                _ => {}
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(vec![SourceDocument::new(
            content.trim_end(),
            DocumentMetadata::file(source),
        )])
    }

    /// Render markdown to plain text, keeping heading markers and code fences
    /// so the markdown splitter can still find section boundaries
    fn parse_markdown(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let raw = std::str::from_utf8(data)
            .map_err(|e| Error::file_parse(source, format!("Invalid UTF-8: {}", e)))?;

        let mut out = String::new();
        for event in Parser::new(raw) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let depth = match level {
                        HeadingLevel::H1 => 1,
                        HeadingLevel::H2 => 2,
                        HeadingLevel::H3 => 3,
                        HeadingLevel::H4 => 4,
                        HeadingLevel::H5 => 5,
                        HeadingLevel::H6 => 6,
                    };
                    out.push_str(&"#".repeat(depth));
                    out.push(' ');
                }
                Event::Start(Tag::CodeBlock(_)) => out.push_str("```\n"),
                Event::End(TagEnd::CodeBlock) => out.push_str("```\n\n"),
                Event::Start(Tag::Item) => out.push_str("- "),
                Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Paragraph) => {
                    out.push_str("\n\n")
                }
                Event::End(TagEnd::Item) => out.push('\n'),
                Event::End(TagEnd::List(_)) => out.push('\n'),
                Event::Text(text) | Event::Code(text) => out.push_str(&text),
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::Rule => out.push_str("***\n\n"),
                _ => {}
            }
        }

        Ok(vec![SourceDocument::new(
            out.trim_end(),
            DocumentMetadata::file(source),
        )])
    }

    /// One document per row, formatted as `header: value` lines
    fn parse_csv(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader
            .headers()
            .map_err(|e| Error::file_parse(source, e.to_string()))?
            .clone();

        let mut docs = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::file_parse(source, e.to_string()))?;
            let content = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            docs.push(SourceDocument::new(
                content,
                DocumentMetadata::row(source, row as u32),
            ));
        }

        Ok(docs)
    }

    fn parse_json(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let value: serde_json::Value =
            serde_json::from_slice(data).map_err(|e| Error::file_parse(source, e.to_string()))?;
        let content = serde_json::to_string_pretty(&value)?;
        Ok(vec![SourceDocument::new(content, DocumentMetadata::file(source))])
    }
}
