use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tempfile::TempDir;
use tokio::process::Command;

use super::{AudioDownloader, CaptionSource};
use crate::{DigestError, Result};

/// Caption fetcher using yt-dlp's subtitle download
pub struct YtDlpCaptions {
    yt_dlp_path: String,
    temp_root: Option<PathBuf>,
}

impl YtDlpCaptions {
    pub fn new(yt_dlp_path: impl Into<String>, temp_root: Option<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            temp_root,
        }
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let dir = match &self.temp_root {
            Some(root) => TempDir::new_in(root)?,
            None => TempDir::new()?,
        };
        Ok(dir)
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptions {
    async fn fetch_captions(&self, url: &str) -> Result<Option<String>> {
        let video_id = match super::extract_video_id(url) {
            Ok(id) => id,
            Err(_) => {
                tracing::debug!("{} is not a YouTube video, no hosted captions", url);
                return Ok(None);
            }
        };
        tracing::debug!("Fetching captions for video {}", video_id);

        let workdir = self.scratch_dir()?;
        let template = workdir.path().join(format!("{}.%(ext)s", video_id));

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--skip-download",
                "--write-auto-sub",
                "--write-sub",
                "--sub-lang", "en.*",
                "--sub-format", "vtt",
                "--no-playlist",
                "--output", &template.to_string_lossy(),
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DigestError::new(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            crate::bail!("yt-dlp failed to fetch captions: {}", error.trim());
        }

        let vtt_files: Vec<PathBuf> = fs_err::read_dir(workdir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("vtt"))
            .collect();

        let Some(vtt_path) = pick_caption_file(vtt_files, &video_id) else {
            tracing::debug!("No captions published for {}", url);
            return Ok(None);
        };

        let content = tokio::fs::read_to_string(vtt_path).await?;
        let text = parse_vtt(&content);

        Ok(if text.is_empty() { None } else { Some(text) })
    }
}

/// Audio downloader using yt-dlp
pub struct YtDlpDownloader {
    yt_dlp_path: String,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl AudioDownloader for YtDlpDownloader {
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        tracing::debug!("Downloading audio with yt-dlp for: {}", url);

        let template = output_dir.join("audio.%(ext)s");

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--format", "bestaudio/best",
                "--extract-audio",
                "--audio-format", "mp3",
                "--audio-quality", "0",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                "--output", &template.to_string_lossy(),
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DigestError::new(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            crate::bail!("yt-dlp audio download failed: {}", error.trim());
        }

        find_audio_file(output_dir)
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// yt-dlp picks the final extension, so look for whatever `audio.*` it left behind
fn find_audio_file(dir: &Path) -> Result<PathBuf> {
    fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("audio.") && !name.ends_with(".part"))
                .unwrap_or(false)
        })
        .ok_or_else(|| DigestError::new("Downloaded audio file not found"))
}

/// Prefer plain `<id>.en.vtt`, else the first English variant by name
fn pick_caption_file(mut files: Vec<PathBuf>, video_id: &str) -> Option<PathBuf> {
    let exact = format!("{}.en.vtt", video_id);
    if let Some(i) = files
        .iter()
        .position(|p| p.file_name().and_then(|n| n.to_str()) == Some(exact.as_str()))
    {
        return Some(files.swap_remove(i));
    }

    files.sort();
    files.into_iter().next()
}

fn vtt_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"^(?:\d{2}:)?\d{2}:\d{2}\.\d{3}\s+-->").expect("timestamp pattern is valid"),
            Regex::new(r"<[^>]+>").expect("tag pattern is valid"),
        )
    })
}

/// Flatten a WebVTT document into plain caption text
pub fn parse_vtt(content: &str) -> String {
    let (timestamp, tag) = vtt_patterns();

    let mut lines: Vec<String> = Vec::new();
    for raw in content.lines() {
        let line = raw.trim();

        if line.is_empty()
            || line == "WEBVTT"
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.starts_with("NOTE")
            || timestamp.is_match(line)
            || line.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }

        let text = tag.replace_all(line, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        // Auto-generated captions repeat each line in the following cue
        if lines.last().map(String::as_str) == Some(text) {
            continue;
        }
        lines.push(text.to_string());
    }

    crate::utils::collapse_whitespace(&lines.join(" "))
}
