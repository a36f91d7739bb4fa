use serde::Serialize;
use std::sync::Arc;

use crate::pipeline::{VideoDigest, VideoJob, VideoProcessor};
use crate::runner::{run_concurrent_tasks, TaskOutcome};
use crate::translate::TargetLanguage;
use crate::Result;

/// Per-video record shown to the user; text fields are empty when `error` is set
#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub url: String,
    pub transcript_snippet: String,
    pub summary: String,
    pub translated_summary: String,
    pub language: String,
    pub transcript_source: Option<String>,
    pub error: Option<String>,
}

impl VideoReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<TaskOutcome<VideoJob, VideoDigest>> for VideoReport {
    fn from(outcome: TaskOutcome<VideoJob, VideoDigest>) -> Self {
        match outcome.result {
            Ok(digest) => Self {
                url: outcome.args.url,
                transcript_snippet: digest.transcript_snippet,
                summary: digest.summary,
                translated_summary: digest.translated_summary,
                language: digest.language,
                transcript_source: Some(digest.transcript_source.to_string()),
                error: None,
            },
            Err(e) => Self {
                url: outcome.args.url,
                transcript_snippet: String::new(),
                summary: String::new(),
                translated_summary: String::new(),
                language: String::new(),
                transcript_source: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Process every URL in parallel and return one outcome per URL, in completion order.
///
/// At most `min(max_workers, urls.len())` videos are in flight. More than `max_videos`
/// URLs is rejected before any work starts.
pub async fn process_videos(
    processor: Arc<dyn VideoProcessor>,
    urls: Vec<String>,
    target_language: TargetLanguage,
    use_gpu: bool,
    max_workers: usize,
    max_videos: usize,
) -> Result<Vec<TaskOutcome<VideoJob, VideoDigest>>> {
    if urls.len() > max_videos {
        crate::bail!(
            "Too many videos: {} submitted, at most {} per batch",
            urls.len(),
            max_videos
        );
    }

    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let workers = max_workers.min(urls.len());
    tracing::info!("Processing {} videos with {} workers", urls.len(), workers);

    let jobs: Vec<VideoJob> = urls
        .into_iter()
        .map(|url| VideoJob::new(url, target_language.clone(), use_gpu))
        .collect();

    let outcomes = run_concurrent_tasks(
        move |job: VideoJob| {
            let processor = Arc::clone(&processor);
            async move { processor.process(job).await }
        },
        jobs,
        workers,
    )
    .await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    tracing::info!(
        "Batch finished: {} succeeded, {} failed",
        outcomes.len() - failed,
        failed
    );

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptSource;
    use crate::DigestError;
    use async_trait::async_trait;
    use chrono::Utc;

    struct Echo;

    #[async_trait]
    impl VideoProcessor for Echo {
        async fn process(&self, job: VideoJob) -> Result<VideoDigest> {
            if job.url.contains("broken") {
                return Err(DigestError::new("no transcript"));
            }
            Ok(VideoDigest {
                url: job.url.clone(),
                transcript_snippet: "snippet".to_string(),
                transcript_source: TranscriptSource::Captions,
                summary: format!("summary of {}", job.url),
                translated_summary: format!("{} summary", job.target_language),
                language: job.target_language.to_string(),
                completed_at: Utc::now(),
            })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://youtu.be/video{:06}", i)).collect()
    }

    #[tokio::test]
    async fn test_rejects_oversized_batch() {
        let err = process_videos(Arc::new(Echo), urls(21), TargetLanguage::Auto, false, 4, 20)
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Too many videos"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = process_videos(Arc::new(Echo), Vec::new(), TargetLanguage::Auto, false, 4, 20)
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_jobs_carry_language_and_gpu_flag() {
        let outcomes = process_videos(
            Arc::new(Echo),
            urls(3),
            TargetLanguage::Code("fr".into()),
            true,
            4,
            20,
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(outcome.args.use_gpu);
            assert_eq!(outcome.args.target_language, TargetLanguage::Code("fr".into()));
        }
    }

    #[test]
    fn test_report_from_failure_has_empty_text() {
        let outcome = TaskOutcome {
            args: VideoJob::new("https://youtu.be/broken", TargetLanguage::Auto, false),
            result: Err(DigestError::new("no transcript")),
        };

        let report = VideoReport::from(outcome);
        assert!(!report.is_success());
        assert_eq!(report.error.as_deref(), Some("no transcript"));
        assert!(report.summary.is_empty());
        assert!(report.translated_summary.is_empty());
        assert!(report.transcript_source.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["url"], "https://youtu.be/broken");
        assert_eq!(json["error"], "no transcript");
    }
}
