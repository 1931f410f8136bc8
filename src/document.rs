use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::OnceLock;

use crate::chunking::Chunker;
use crate::docx::extract_docx_text;
use crate::error::{RagError, Result};

/// Supported input formats, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Pick the format from the (case-insensitive) file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" => Ok(DocumentFormat::PlainText),
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(RagError::UnsupportedType(extension)),
        }
    }

    /// Extract the raw text of a file in this format
    pub fn extract(self, path: &Path) -> Result<String> {
        match self {
            DocumentFormat::PlainText => {
                info!("Processing text document: {}", path.display());
                fs::read_to_string(path).map_err(|source| RagError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
            DocumentFormat::Docx => {
                info!("Processing DOCX document: {}", path.display());
                extract_docx_text(path)
            }
            DocumentFormat::Pdf => {
                info!("Processing PDF document: {}", path.display());
                extract_pdf_text(path)
            }
        }
    }
}

/// Represents a document with its cleaned content and metadata
#[derive(Debug, Clone)]
pub struct Document {
    /// Cleaned text content of the document
    pub content: String,
    /// The document's file name (used as the chunk source)
    pub document_id: String,
    pub format: DocumentFormat,
}

impl Document {
    /// Load and clean a document from a file path
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(RagError::NotFound(path.to_path_buf()));
        }

        let format = DocumentFormat::from_path(path)?;
        debug!("Detected document format: {:?}", format);

        let document_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let raw = format.extract(path)?;
        let content = clean_text(&raw);
        if content.is_empty() {
            warn!("Document {} contains no text after cleaning", document_id);
        }

        Ok(Document {
            content,
            document_id,
            format,
        })
    }

    /// Split the cleaned content with the given chunker
    pub fn chunks(&self, chunker: &Chunker) -> Vec<String> {
        chunker.chunk(&self.content)
    }
}

/// Load a document and split it with the default chunk sizing
pub fn load_document<P: AsRef<Path>>(file_path: P) -> Result<Vec<String>> {
    let document = Document::from_file(file_path)?;
    Ok(document.chunks(&Chunker::default()))
}

/// Normalize extracted text before chunking.
///
/// Whitespace runs become a single space and anything other than word
/// characters, whitespace and basic punctuation is dropped.
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let disallowed =
        DISALLOWED.get_or_init(|| Regex::new(r#"[^\w\s.,!?;:()\-"]"#).expect("valid regex"));

    let collapsed = whitespace.replace_all(text, " ");
    let stripped = disallowed.replace_all(&collapsed, "");
    stripped.trim().to_string()
}

fn extract_pdf_text(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed fonts
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(path)
    }))
    .map_err(|payload| RagError::Extraction {
        path: path.to_path_buf(),
        message: panic_message(payload.as_ref()),
    })?
    .map_err(|e| RagError::Extraction {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(join_pages(&pages))
}

/// Join page texts with newlines, skipping blank pages
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("PDF backend panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("PDF backend panicked: {}", message)
    } else {
        "PDF backend panicked".to_string()
    }
}
