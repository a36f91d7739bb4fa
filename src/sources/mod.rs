use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub mod script;
pub mod youtube;

pub use script::{ScriptDownloader, ScriptResponse};
pub use youtube::{YtDlpCaptions, YtDlpDownloader};

use crate::{DigestError, Result};

/// Fetches captions hosted alongside a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Return the caption text, or `None` when the video has none
    async fn fetch_captions(&self, url: &str) -> Result<Option<String>>;
}

/// Downloads the audio track of a video into a directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Download audio into `output_dir` and return the file path
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;

    /// Get the name of this tool
    fn tool_name(&self) -> &'static str;
}

/// Tries each downloader in order until one succeeds
pub struct FallbackDownloader {
    downloaders: Vec<Box<dyn AudioDownloader>>,
}

impl FallbackDownloader {
    pub fn new() -> Self {
        Self {
            downloaders: Vec::new(),
        }
    }

    /// Register a new downloader; earlier registrations are tried first
    pub fn register(&mut self, downloader: Box<dyn AudioDownloader>) {
        self.downloaders.push(downloader);
    }

    pub fn with(mut self, downloader: Box<dyn AudioDownloader>) -> Self {
        self.register(downloader);
        self
    }

    /// List tool names in the order they are tried
    pub fn list_tools(&self) -> Vec<&'static str> {
        self.downloaders.iter().map(|d| d.tool_name()).collect()
    }
}

impl Default for FallbackDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDownloader for FallbackDownloader {
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let mut failures = Vec::new();

        for downloader in &self.downloaders {
            tracing::debug!("Downloading audio with {}", downloader.tool_name());
            match downloader.download_audio(url, output_dir).await {
                Ok(path) => {
                    tracing::info!("Audio downloaded with {}: {}", downloader.tool_name(), path.display());
                    return Ok(path);
                }
                Err(e) => {
                    tracing::warn!("{} failed for {}: {}", downloader.tool_name(), url, e);
                    failures.push(format!("{}: {}", downloader.tool_name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(DigestError::new("No audio downloader configured"));
        }

        Err(DigestError::new(format!(
            "All audio downloaders failed ({})",
            failures.join("; ")
        )))
    }

    fn tool_name(&self) -> &'static str {
        "fallback"
    }
}

/// Download into a new `vdigest-audio-<uuid>` directory under `root` that the caller then owns.
/// The directory is removed again when the download fails.
pub async fn download_to_owned_dir(downloader: &dyn AudioDownloader, url: &str, root: &Path) -> Result<PathBuf> {
    let workdir = tempfile::Builder::new()
        .prefix(&format!("vdigest-audio-{}", uuid::Uuid::new_v4()))
        .rand_bytes(0)
        .tempdir_in(root)?;

    let audio_path = downloader.download_audio(url, workdir.path()).await?;
    let kept = workdir.keep();
    tracing::debug!("Keeping audio directory {}", kept.display());
    Ok(audio_path)
}

fn video_id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
            r"youtu\.be/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("video id pattern is valid"))
        .collect()
    })
}

/// Extract the YouTube video id from the common URL shapes
pub fn extract_video_id(url: &str) -> Result<String> {
    let url = url.trim();
    video_id_patterns()
        .iter()
        .find_map(|re| re.captures(url).map(|caps| caps[1].to_string()))
        .ok_or_else(|| DigestError::new(format!("Could not extract video ID from URL: {}", url)))
}
