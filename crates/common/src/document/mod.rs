//! Uploaded document handling
//!
//! Turns raw upload bytes into plain text and caches the result by content
//! hash so repeated uploads of the same file skip extraction.

mod pdf;

use crate::cache::{keys, Cache};
use crate::config::CacheConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub use pdf::extract_text as extract_pdf_text;

/// Text extraction seam for uploaded files
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Extracts `.txt`, `.md` and `.pdf` files in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDocumentExtractor;

impl LocalDocumentExtractor {
    pub const SUPPORTED: &'static [&'static str] = &["txt", "md", "pdf"];
}

#[async_trait]
impl DocumentExtractor for LocalDocumentExtractor {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        match extension(filename).as_str() {
            "txt" | "md" => Ok(decode_text(bytes)),
            "pdf" => {
                let bytes = bytes.to_vec();
                tokio::task::spawn_blocking(move || pdf::extract_text(&bytes))
                    .await
                    .map_err(|e| AppError::Internal {
                        message: format!("PDF extraction task failed: {}", e),
                    })?
            }
            other => Err(AppError::InvalidFormat {
                message: format!(
                    "Unsupported file type: .{}. Supported: .txt, .md, .pdf",
                    other
                ),
            }),
        }
    }
}

/// Lowercased extension, empty when absent
fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// UTF-8 first, Latin-1 otherwise
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Extracted text plus simple statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub filename: String,
    pub content: String,
    pub word_count: usize,
    pub line_count: usize,
    pub file_size_bytes: usize,
    pub cached: bool,
}

impl ExtractedDocument {
    fn new(filename: &str, content: String, file_size_bytes: usize) -> Self {
        Self {
            filename: filename.to_string(),
            word_count: content.split_whitespace().count(),
            line_count: content.split('\n').count(),
            content,
            file_size_bytes,
            cached: false,
        }
    }
}

/// Extractor wrapped with a content-hash cache
pub struct DocumentProcessor {
    extractor: Arc<dyn DocumentExtractor>,
    cache: Cache,
}

impl DocumentProcessor {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, config: CacheConfig) -> Self {
        Self {
            extractor,
            cache: Cache::named("document", config),
        }
    }

    /// Local extractor with the given cache settings
    pub fn local(config: CacheConfig) -> Self {
        Self::new(Arc::new(LocalDocumentExtractor), config)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process(&self, filename: &str, bytes: &[u8]) -> Result<ExtractedDocument> {
        let key = keys::document(bytes);

        if let Some(mut hit) = self.cache.get::<ExtractedDocument>(&key).await? {
            debug!(filename, "Document cache hit");
            hit.cached = true;
            hit.filename = filename.to_string();
            return Ok(hit);
        }

        let content = self.extractor.extract(filename, bytes).await?;
        let document = ExtractedDocument::new(filename, content, bytes.len());
        self.cache.set(&key, &document).await?;

        info!(filename, words = document.word_count, "Document extracted");
        Ok(document)
    }
}

#[async_trait]
impl DocumentExtractor for DocumentProcessor {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        Ok(self.process(filename, bytes).await?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentExtractor for CountingExtractor {
        async fn extract(&self, _filename: &str, bytes: &[u8]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(decode_text(bytes))
        }
    }

    #[tokio::test]
    async fn test_text_and_markdown() {
        let extractor = LocalDocumentExtractor;
        assert_eq!(extractor.extract("notes.TXT", b"hello").await.unwrap(), "hello");
        assert_eq!(extractor.extract("readme.md", b"# Title").await.unwrap(), "# Title");
    }

    #[tokio::test]
    async fn test_latin1_fallback() {
        let text = LocalDocumentExtractor
            .extract("notes.txt", b"caf\xe9 au lait")
            .await
            .unwrap();
        assert_eq!(text, "café au lait");
    }

    #[tokio::test]
    async fn test_pdf_extraction() {
        let bytes = pdf::tests::sample_pdf(&["Rollups batch transactions"]);
        let text = LocalDocumentExtractor.extract("paper.pdf", &bytes).await.unwrap();
        assert_eq!(text, "Rollups batch transactions");
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let err = LocalDocumentExtractor.extract("sheet.docx", b"PK").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));
        assert!(err.to_string().contains(".docx"));
    }

    #[tokio::test]
    async fn test_statistics() {
        let processor = DocumentProcessor::local(CacheConfig::default());
        let doc = processor.process("a.txt", b"one two\nthree\n").await.unwrap();

        assert_eq!(doc.word_count, 3);
        assert_eq!(doc.line_count, 3);
        assert_eq!(doc.file_size_bytes, 14);
        assert!(!doc.cached);
    }

    #[tokio::test]
    async fn test_identical_content_hits_cache() {
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
        });
        let processor = DocumentProcessor::new(extractor.clone(), CacheConfig::default());

        let first = processor.process("a.txt", b"same bytes").await.unwrap();
        let second = processor.process("b.txt", b"same bytes").await.unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.filename, "b.txt");
        assert_eq!(second.content, first.content);
    }

    #[tokio::test]
    async fn test_failed_extraction_is_not_cached() {
        let processor = DocumentProcessor::local(CacheConfig::default());

        assert!(processor.process("x.bin", b"data").await.is_err());
        assert!(processor.cache.is_empty().await);
    }
}
