use std::sync::Arc;

use crate::config::{Config, ModelBackend, SummarizerConfig};
use crate::inference::InferenceClient;
use crate::utils::{collapse_whitespace, split_sentences, truncate_chars};
use crate::Result;

pub mod models;

pub use models::{ExtractiveSummarizer, SummaryModel, SummaryParams};

/// Character span of one chunk within the whitespace-collapsed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

/// Compute chunk spans over `chars`.
///
/// Each span is at most `max_chunk_size` long, ends just after a sentence terminator when one
/// lies within `lookback` characters of the limit, and the next span starts `overlap`
/// characters before the previous end.
pub fn chunk_spans(chars: &[char], max_chunk_size: usize, overlap: usize, lookback: usize) -> Vec<ChunkSpan> {
    let len = chars.len();
    let max_chunk_size = max_chunk_size.max(1);

    if len <= max_chunk_size {
        return vec![ChunkSpan { start: 0, end: len }];
    }

    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start + max_chunk_size;

        if end < len {
            let floor = start.max(end.saturating_sub(lookback));
            if let Some(i) = (floor + 1..end).rev().find(|&i| matches!(chars[i], '.' | '!' | '?')) {
                end = i + 1;
            }
        } else {
            end = len;
        }

        spans.push(ChunkSpan { start, end });

        if end >= len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    spans
}

/// Split text into overlapping chunks small enough for the summarization model
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize, lookback: usize) -> Vec<String> {
    let text = collapse_whitespace(text);
    let chars: Vec<char> = text.chars().collect();

    let chunks: Vec<String> = chunk_spans(&chars, max_chunk_size, overlap, lookback)
        .into_iter()
        .map(|span| chars[span.start..span.end].iter().collect::<String>().trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect();

    if chunks.is_empty() {
        // Empty input still yields the one (empty) chunk
        return vec![text];
    }

    chunks
}

/// Chunk, summarize and merge long transcripts
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>, config: SummarizerConfig) -> Self {
        Self { model, config }
    }

    /// Summarizer backed by the configured model
    pub fn from_config(config: &Config) -> Self {
        let model: Arc<dyn SummaryModel> = match config.models.backend {
            ModelBackend::Hosted => Arc::new(InferenceClient::new(&config.models, config.inference_token())),
            ModelBackend::Extractive => Arc::new(ExtractiveSummarizer::default()),
        };
        tracing::debug!("Summarization model: {}", model.model_name());
        Self::new(model, config.summarizer.clone())
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let chunks = chunk_text(
            text,
            self.config.max_chunk_size,
            self.config.overlap,
            self.config.sentence_lookback,
        );
        tracing::debug!("Split text into {} chunks", chunks.len());
        chunks
    }

    /// Summarize one chunk; a model failure degrades to the chunk's first sentences
    pub async fn summarize_chunk(&self, chunk: &str) -> String {
        let input = truncate_chars(chunk, self.config.max_input_length);
        let params = SummaryParams {
            max_length: self.config.summary_max_length,
            min_length: self.config.summary_min_length,
        };

        match self.model.summarize(input, params).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                tracing::warn!("Failed to summarize chunk with {}: {}", self.model.model_name(), e);
                let lead: Vec<&str> = split_sentences(chunk).into_iter().take(3).collect();
                format!("{}.", lead.join(". "))
            }
        }
    }

    /// Combine per-chunk summaries, condensing again if the result is still long
    pub async fn merge_summaries(&self, summaries: Vec<String>) -> String {
        if summaries.len() <= 1 {
            return summaries.into_iter().next().unwrap_or_default();
        }

        let combined = summaries.join(" ");
        if combined.chars().count() > self.config.merge_threshold {
            tracing::debug!("Merged summary is {} characters, summarizing again", combined.chars().count());
            return self.summarize_chunk(&combined).await;
        }

        combined
    }

    pub async fn summarize(&self, text: &str) -> Result<String> {
        tracing::info!("Starting summarization");

        if text.trim().chars().count() < self.config.min_text_length {
            crate::bail!("Transcript is too short to summarize");
        }

        let chunks = self.chunk_text(text);
        let mut chunk_summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!("Summarizing chunk {}/{}", i + 1, chunks.len());
            chunk_summaries.push(self.summarize_chunk(chunk).await);
        }

        let summary = self.merge_summaries(chunk_summaries).await;
        tracing::info!("Summarization completed. Final summary length: {}", summary.chars().count());

        Ok(summary)
    }
}
