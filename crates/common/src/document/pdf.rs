//! PDF text extraction
//!
//! Walks each page's content stream with lopdf and collects the strings shown
//! by the text operators (`Tj`, `TJ`, `'`, `"`).

use crate::errors::{AppError, Result};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

/// Kerning offset (thousandths of an em) treated as a word break inside `TJ`
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Extract text content from in-memory PDF bytes
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes).map_err(|e| AppError::InvalidFormat {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for (page_num, page_id) in pages {
        match page_text(&doc, page_id) {
            Ok(page) => {
                text.push_str(&page);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    if text.trim().is_empty() {
        return Err(AppError::InvalidFormat {
            message: "No text content extracted from PDF".to_string(),
        });
    }

    let cleaned = clean_text(&text);
    debug!(raw_len = text.len(), cleaned_len = cleaned.len(), "PDF text extracted");
    Ok(cleaned)
}

fn page_text(doc: &Document, page_id: ObjectId) -> std::result::Result<String, lopdf::Error> {
    let raw = doc.get_page_content(page_id)?;
    let content = Content::decode(&raw)?;

    let mut text = String::new();
    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" | "'" | "\"" => {
                if matches!(op.operator.as_str(), "'" | "\"") {
                    text.push('\n');
                }
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    text.push_str(&decode_pdf_string(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                            Object::Integer(n) if (*n as f32) < TJ_SPACE_THRESHOLD => text.push(' '),
                            Object::Real(n) if *n < TJ_SPACE_THRESHOLD => text.push(' '),
                            _ => {}
                        }
                    }
                }
            }
            "T*" | "Td" | "TD" => text.push('\n'),
            "ET" => text.push(' '),
            _ => {}
        }
    }

    Ok(text)
}

/// Decode a PDF string object: UTF-16BE with BOM, otherwise one byte per char
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Collapse whitespace per line and drop blank lines
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
