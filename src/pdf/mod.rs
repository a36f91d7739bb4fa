use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::qa::{Answer, QaEngine};
use crate::summarize::Summarizer;
use crate::{DigestError, Result};

/// Fewer extracted characters than this means there is nothing to summarize
const MIN_PDF_TEXT: usize = 50;

/// Extract the text layer of a PDF
pub async fn extract_text(path: &Path) -> Result<String> {
    let owned: PathBuf = path.to_path_buf();

    // pdf-extract can panic on malformed files
    let extracted = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&owned).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| DigestError::new(format!("PDF extraction crashed for {}: {}", path.display(), e)))?;

    let text = extracted.map_err(|e| {
        DigestError::new(format!("Failed to extract text from PDF {}: {}", path.display(), e))
    })?;

    tracing::debug!("Extracted {} characters from {}", text.chars().count(), path.display());
    Ok(text)
}

/// SHA-256 of the file contents, lowercase hex
pub fn content_hash(path: &Path) -> Result<String> {
    let bytes = fs_err::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Summaries keyed by content hash; entries are never replaced or evicted
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: HashMap<String, String>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    /// Store a summary unless the hash already has one; returns the summary kept
    pub fn insert(&mut self, hash: String, summary: String) -> &str {
        self.entries.entry(hash).or_insert(summary)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summarize PDFs and answer questions about them
pub struct PdfDigest {
    summarizer: Arc<Summarizer>,
    qa: Arc<QaEngine>,
}

impl PdfDigest {
    pub fn new(summarizer: Arc<Summarizer>, qa: Arc<QaEngine>) -> Self {
        Self { summarizer, qa }
    }

    pub async fn summarize(&self, path: &Path, cache: &mut SummaryCache) -> Result<String> {
        let hash = content_hash(path)?;
        if let Some(summary) = cache.get(&hash) {
            tracing::info!("Using cached summary for {}", path.display());
            return Ok(summary.to_string());
        }

        let text = extract_text(path).await?;
        self.summarize_text(hash, &text, cache).await
    }

    async fn summarize_text(&self, hash: String, text: &str, cache: &mut SummaryCache) -> Result<String> {
        if let Some(summary) = cache.get(&hash) {
            return Ok(summary.to_string());
        }

        if text.trim().chars().count() < MIN_PDF_TEXT {
            crate::bail!("PDF does not contain enough text to summarize");
        }

        let summary = self.summarizer.summarize(text).await?;
        Ok(cache.insert(hash, summary).to_string())
    }

    /// Answer in English from the PDF summary
    pub async fn ask(&self, summary: &str, question: &str) -> Result<Answer> {
        self.qa.answer(summary, question, "en").await
    }
}
