//! Text extraction from DOCX files.
//!
//! A DOCX file is a zip archive; the body lives in `word/document.xml`.
//! Body paragraphs are emitted first, one per line, followed by every table
//! row with its cells joined by `" | "`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{RagError, Result};

/// Extract paragraph and table text from a DOCX file
pub fn extract_docx_text(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|source| RagError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let extraction_error = |message: String| RagError::Extraction {
        path: path.to_path_buf(),
        message,
    };

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| extraction_error(format!("Invalid DOCX archive: {}", e)))?;
    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|_| extraction_error("No document.xml found in DOCX".to_string()))?;

    let mut xml = String::new();
    document_xml
        .read_to_string(&mut xml)
        .map_err(|e| extraction_error(format!("Failed to read document.xml: {}", e)))?;

    Ok(extract_text_from_document_xml(&xml))
}

/// Walks `word/document.xml` and collects body paragraphs and table rows
pub fn extract_text_from_document_xml(xml: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();

    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;

    let mut chars = xml.chars();
    while let Some(c) = chars.next() {
        if c != '<' {
            if in_text {
                paragraph.push(c);
            }
            continue;
        }

        let mut tag = String::new();
        for tc in chars.by_ref() {
            if tc == '>' {
                break;
            }
            tag.push(tc);
        }

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match (name, closing) {
            ("w:t", false) if !self_closing => in_text = true,
            ("w:t", true) => in_text = false,
            ("w:tab", false) => paragraph.push('\t'),
            ("w:br" | "w:cr", false) => paragraph.push('\n'),
            ("w:p", false) if !self_closing => paragraph.clear(),
            ("w:p", true) => {
                let text = decode_entities(paragraph.trim());
                paragraph.clear();
                if table_depth == 0 {
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                } else if !text.is_empty() {
                    if !cell.is_empty() {
                        cell.push('\n');
                    }
                    cell.push_str(&text);
                }
            }
            ("w:tbl", false) if !self_closing => table_depth += 1,
            ("w:tbl", true) => table_depth = table_depth.saturating_sub(1),
            ("w:tr", false) if table_depth == 1 && !self_closing => row_cells.clear(),
            ("w:tr", true) if table_depth == 1 => {
                if !row_cells.is_empty() {
                    rows.push(row_cells.join(" | "));
                }
                row_cells.clear();
            }
            ("w:tc", false) if table_depth == 1 && !self_closing => cell.clear(),
            ("w:tc", true) if table_depth == 1 => {
                let text = cell.trim();
                if !text.is_empty() {
                    row_cells.push(text.to_string());
                }
                cell.clear();
            }
            _ => {}
        }
    }

    paragraphs.extend(rows);
    paragraphs.join("\n")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';') else {
            out.push_str(after);
            return out;
        };

        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
