use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::sources::{AudioDownloader, CaptionSource};
use crate::Result;

pub mod whisper;

pub use whisper::{SpeechToText, WhisperCli};

/// Where a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    Captions,
    Speech,
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Captions => write!(f, "captions"),
            TranscriptSource::Speech => write!(f, "speech-to-text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub source: TranscriptSource,
}

/// Gets a transcript for a video: hosted captions first, audio transcription otherwise
pub struct TranscriptAcquirer {
    captions: Arc<dyn CaptionSource>,
    downloader: Arc<dyn AudioDownloader>,
    speech: Arc<dyn SpeechToText>,
    min_caption_length: usize,
    temp_root: Option<PathBuf>,
}

impl TranscriptAcquirer {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        downloader: Arc<dyn AudioDownloader>,
        speech: Arc<dyn SpeechToText>,
    ) -> Self {
        Self {
            captions,
            downloader,
            speech,
            min_caption_length: 100,
            temp_root: None,
        }
    }

    /// Captions must be longer than this many characters to be used
    pub fn with_min_caption_length(mut self, min_caption_length: usize) -> Self {
        self.min_caption_length = min_caption_length;
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    pub async fn acquire(&self, url: &str, use_gpu: bool) -> Result<Transcript> {
        tracing::info!("Processing transcript for: {}", url);

        match self.captions.fetch_captions(url).await {
            Ok(Some(text)) if text.chars().count() > self.min_caption_length => {
                tracing::info!("Using hosted captions ({} characters)", text.chars().count());
                return Ok(Transcript {
                    text,
                    source: TranscriptSource::Captions,
                });
            }
            Ok(Some(text)) => {
                tracing::info!(
                    "Captions too short ({} characters), transcribing audio instead",
                    text.chars().count()
                );
            }
            Ok(None) => tracing::info!("No captions available, transcribing audio"),
            Err(e) => tracing::warn!("Could not get captions: {}", e),
        }

        // Dropping the directory removes the downloaded audio
        let workdir = match &self.temp_root {
            Some(root) => TempDir::new_in(root)?,
            None => TempDir::new()?,
        };

        let audio_path = self.downloader.download_audio(url, workdir.path()).await?;
        let text = self.speech.transcribe(&audio_path, use_gpu).await?;

        if text.trim().is_empty() {
            crate::bail!("Transcription produced no text for {}", url);
        }

        Ok(Transcript {
            text,
            source: TranscriptSource::Speech,
        })
    }
}
