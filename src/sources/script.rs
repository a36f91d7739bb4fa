use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::AudioDownloader;
use crate::{DigestError, Result};

/// JSON object printed on stdout by the process-boundary helpers.
///
/// `success` is always present; a successful response carries the artifact
/// (`audio_path`, or `transcript` and `length`) and a `message`, a failed one carries `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptResponse {
    pub fn audio(path: PathBuf) -> Self {
        Self {
            success: true,
            message: Some(format!("Audio downloaded successfully to {}", path.display())),
            audio_path: Some(path),
            transcript: None,
            length: None,
            error: None,
        }
    }

    pub fn transcript(text: String) -> Self {
        let length = text.chars().count();
        Self {
            success: true,
            audio_path: None,
            message: Some(format!("Transcription completed successfully ({} characters)", length)),
            transcript: Some(text),
            length: Some(length),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            audio_path: None,
            transcript: None,
            length: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Parse helper output; tolerates log lines printed before the JSON object
    pub fn parse(stdout: &str) -> Result<Self> {
        let trimmed = stdout.trim();
        if let Ok(response) = serde_json::from_str(trimmed) {
            return Ok(response);
        }

        let last_line = trimmed
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| DigestError::new("Helper produced no output"))?;

        serde_json::from_str(last_line.trim())
            .map_err(|e| DigestError::new(format!("Helper output is not a valid response: {}", e)))
    }

    /// Turn a failure response into an error
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(DigestError::new(
                self.error.unwrap_or_else(|| "helper reported failure".to_string()),
            ))
        }
    }

    /// Print as a single JSON line and return the process exit code
    pub fn emit(&self) -> i32 {
        println!("{}", self.to_json_line());
        if self.success { 0 } else { 1 }
    }

    /// Single-line JSON form of this response
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": e.to_string() }).to_string()
        })
    }
}

/// Run a helper that speaks the [`ScriptResponse`] protocol
pub async fn run_script(program: &str, args: &[&str]) -> Result<ScriptResponse> {
    tracing::debug!("Running helper: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DigestError::new(format!("Failed to run {}: {}", program, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let response = match ScriptResponse::parse(&stdout) {
        Ok(response) => response,
        Err(_) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            crate::bail!("{} exited with {}: {}", program, output.status, stderr.trim());
        }
        Err(e) => return Err(e),
    };

    response.into_result()
}

/// Audio downloader backed by the pytube helper script
pub struct ScriptDownloader {
    python: String,
    script: PathBuf,
}

impl ScriptDownloader {
    pub fn new(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }
}

#[async_trait]
impl AudioDownloader for ScriptDownloader {
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let script = self.script.to_string_lossy();
        let response = run_script(&self.python, &[script.as_ref(), url]).await?;

        let source = response
            .audio_path
            .ok_or_else(|| DigestError::new("pytube helper did not report an audio path"))?;

        // The helper writes to its own temp dir; move the file under the job's dir so it is cleaned up
        let file_name = source
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "audio.mp4".into());
        let target = output_dir.join(file_name);

        if tokio::fs::rename(&source, &target).await.is_err() {
            tokio::fs::copy(&source, &target).await?;
            if let Err(e) = tokio::fs::remove_file(&source).await {
                tracing::warn!("Failed to remove helper audio {}: {}", source.display(), e);
            }
        }

        Ok(target)
    }

    fn tool_name(&self) -> &'static str {
        "pytube"
    }
}
