use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::sources::{FallbackDownloader, ScriptDownloader, YtDlpCaptions, YtDlpDownloader};
use crate::summarize::Summarizer;
use crate::transcribe::{TranscriptAcquirer, TranscriptSource, WhisperCli};
use crate::translate::{translate_summary, translator_from_config, TargetLanguage, Translator};
use crate::utils::{truncate_chars, validate_and_normalize_url};
use crate::Result;

/// Arguments of one video job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub url: String,
    pub target_language: TargetLanguage,
    pub use_gpu: bool,
}

impl VideoJob {
    pub fn new(url: impl Into<String>, target_language: TargetLanguage, use_gpu: bool) -> Self {
        Self {
            url: url.into(),
            target_language,
            use_gpu,
        }
    }
}

/// What a successful job produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDigest {
    pub url: String,
    pub transcript_snippet: String,
    pub transcript_source: TranscriptSource,
    pub summary: String,
    pub translated_summary: String,
    /// Language questions about this video are answered in
    pub language: String,
    pub completed_at: DateTime<Utc>,
}

/// Turns one job into a digest
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    async fn process(&self, job: VideoJob) -> Result<VideoDigest>;
}

/// Transcript, then summary, then translation; the first failing step ends the job
pub struct VideoPipeline {
    acquirer: TranscriptAcquirer,
    summarizer: Arc<Summarizer>,
    translator: Arc<dyn Translator>,
    snippet_length: usize,
}

impl VideoPipeline {
    pub fn new(
        acquirer: TranscriptAcquirer,
        summarizer: Arc<Summarizer>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            acquirer,
            summarizer,
            translator,
            snippet_length: 500,
        }
    }

    pub fn with_snippet_length(mut self, snippet_length: usize) -> Self {
        self.snippet_length = snippet_length;
        self
    }

    /// Wire up yt-dlp, the optional pytube script, whisper and the configured models
    pub fn from_config(config: &Config) -> Self {
        let tools = &config.tools;

        let mut downloader =
            FallbackDownloader::new().with(Box::new(YtDlpDownloader::new(tools.yt_dlp.clone())));
        if let Some(script) = &tools.pytube_script {
            downloader.register(Box::new(ScriptDownloader::new(tools.python.clone(), script.clone())));
        }
        tracing::debug!("Audio downloaders: {:?}", downloader.list_tools());

        let acquirer = TranscriptAcquirer::new(
            Arc::new(YtDlpCaptions::new(tools.yt_dlp.clone(), config.app.temp_dir.clone())),
            Arc::new(downloader),
            Arc::new(WhisperCli::new(tools.whisper.clone())),
        )
        .with_min_caption_length(config.batch.min_caption_length)
        .with_temp_root(config.app.temp_dir.clone());

        Self::new(
            acquirer,
            Arc::new(Summarizer::from_config(config)),
            translator_from_config(&config.translation),
        )
        .with_snippet_length(config.batch.snippet_length)
    }

    pub fn translator(&self) -> Arc<dyn Translator> {
        Arc::clone(&self.translator)
    }
}

#[async_trait]
impl VideoProcessor for VideoPipeline {
    async fn process(&self, job: VideoJob) -> Result<VideoDigest> {
        let url = validate_and_normalize_url(&job.url)?;

        let transcript = self.acquirer.acquire(&url, job.use_gpu).await?;
        tracing::info!(
            "Got {} character transcript from {} for {}",
            transcript.text.chars().count(),
            transcript.source,
            url
        );

        let summary = self.summarizer.summarize(&transcript.text).await?;
        let translation = translate_summary(self.translator.as_ref(), &summary, &job.target_language).await?;

        Ok(VideoDigest {
            url: job.url,
            transcript_snippet: truncate_chars(&transcript.text, self.snippet_length).to_string(),
            transcript_source: transcript.source,
            summary,
            translated_summary: translation.text,
            language: translation.language,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizerConfig;
    use crate::sources::{MockAudioDownloader, MockCaptionSource};
    use crate::summarize::ExtractiveSummarizer;
    use crate::transcribe::whisper::MockSpeechToText;
    use crate::translate::MockTranslator;
    use crate::DigestError;
    use mockall::predicate::eq;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn captions_text() -> String {
        "Ferris the crab explains why borrowing matters. ".repeat(30)
    }

    fn acquirer_with_captions(text: String) -> TranscriptAcquirer {
        let mut captions = MockCaptionSource::new();
        captions
            .expect_fetch_captions()
            .returning(move |_| Ok(Some(text.clone())));
        let mut downloader = MockAudioDownloader::new();
        downloader.expect_download_audio().never();
        let mut speech = MockSpeechToText::new();
        speech.expect_transcribe().never();

        TranscriptAcquirer::new(Arc::new(captions), Arc::new(downloader), Arc::new(speech))
    }

    fn summarizer() -> Arc<Summarizer> {
        Arc::new(Summarizer::new(
            Arc::new(ExtractiveSummarizer::default()),
            SummarizerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_process_builds_digest() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Ok(Some("en".to_string())));
        translator
            .expect_translate()
            .with(mockall::predicate::always(), eq("es"))
            .times(1)
            .returning(|_, _| Ok("Resumen en español.".to_string()));

        let pipeline = VideoPipeline::new(
            acquirer_with_captions(captions_text()),
            summarizer(),
            Arc::new(translator),
        );

        let job = VideoJob::new(URL, TargetLanguage::Code("es".into()), false);
        let digest = pipeline.process(job).await.unwrap();

        assert_eq!(digest.url, URL);
        assert_eq!(digest.transcript_source, TranscriptSource::Captions);
        assert_eq!(digest.transcript_snippet.chars().count(), 500);
        assert!(captions_text().starts_with(&digest.transcript_snippet));
        assert!(!digest.summary.is_empty());
        assert_eq!(digest.translated_summary, "Resumen en español.");
        assert_eq!(digest.language, "es");
    }

    #[tokio::test]
    async fn test_english_summary_is_not_translated() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Ok(Some("en".to_string())));
        translator.expect_translate().never();

        let pipeline = VideoPipeline::new(
            acquirer_with_captions(captions_text()),
            summarizer(),
            Arc::new(translator),
        );

        let digest = pipeline
            .process(VideoJob::new(URL, TargetLanguage::Auto, false))
            .await
            .unwrap();
        assert_eq!(digest.translated_summary, digest.summary);
        assert_eq!(digest.language, "en");
    }

    #[tokio::test]
    async fn test_translation_failure_fails_the_job() {
        let mut translator = MockTranslator::new();
        translator.expect_detect_language().returning(|_| Ok(None));
        translator
            .expect_translate()
            .returning(|_, _| Err(DigestError::new("Translation request failed: HTTP 429")));

        let pipeline = VideoPipeline::new(
            acquirer_with_captions(captions_text()),
            summarizer(),
            Arc::new(translator),
        );

        let err = pipeline
            .process(VideoJob::new(URL, TargetLanguage::Code("de".into()), false))
            .await
            .unwrap_err();
        assert!(err.message().contains("HTTP 429"));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_any_work() {
        let mut captions = MockCaptionSource::new();
        captions.expect_fetch_captions().never();
        let acquirer = TranscriptAcquirer::new(
            Arc::new(captions),
            Arc::new(MockAudioDownloader::new()),
            Arc::new(MockSpeechToText::new()),
        );

        let pipeline = VideoPipeline::new(acquirer, summarizer(), Arc::new(MockTranslator::new()));
        let err = pipeline
            .process(VideoJob::new("not a url", TargetLanguage::Auto, false))
            .await
            .unwrap_err();
        assert!(err.message().contains("Invalid URL format"));
    }

    #[test]
    fn test_from_config_uses_batch_settings() {
        let mut config = Config::default();
        config.tools.pytube_script = Some("scripts/pytube_download.py".into());
        config.batch.snippet_length = 120;
        let pipeline = VideoPipeline::from_config(&config);
        assert_eq!(pipeline.snippet_length, 120);
    }
}
