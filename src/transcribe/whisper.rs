use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::{DigestError, Result};

/// Model every transcription runs with; smallest and fastest of the whisper family
pub const WHISPER_MODEL: &str = "tiny";

/// Speech-to-text over a local audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path, use_gpu: bool) -> Result<String>;
}

/// Runs the `whisper` command line tool
pub struct WhisperCli {
    program: String,
}

impl WhisperCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(audio_path: &Path, output_dir: &Path, use_gpu: bool) -> Vec<String> {
        let device = if use_gpu { "cuda" } else { "cpu" };
        let mut args = vec![
            audio_path.to_string_lossy().into_owned(),
            "--model".to_string(), WHISPER_MODEL.to_string(),
            "--language".to_string(), "en".to_string(),
            "--task".to_string(), "transcribe".to_string(),
            "--output_format".to_string(), "txt".to_string(),
            "--output_dir".to_string(), output_dir.to_string_lossy().into_owned(),
            "--device".to_string(), device.to_string(),
            "--beam_size".to_string(), "1".to_string(),
            "--temperature".to_string(), "0".to_string(),
            "--condition_on_previous_text".to_string(), "False".to_string(),
            "--verbose".to_string(), "False".to_string(),
        ];
        if !use_gpu {
            // fp16 is unsupported on CPU and only produces a warning
            args.extend(["--fp16".to_string(), "False".to_string()]);
        }
        args
    }

    fn transcript_path(audio_path: &Path, output_dir: &Path) -> PathBuf {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        output_dir.join(format!("{}.txt", stem))
    }
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self::new("whisper")
    }
}

#[async_trait]
impl SpeechToText for WhisperCli {
    async fn transcribe(&self, audio_path: &Path, use_gpu: bool) -> Result<String> {
        if !audio_path.exists() {
            crate::bail!("Audio file not found: {}", audio_path.display());
        }

        // whisper writes `<stem>.txt`; keep it out of the audio's directory
        let output_dir = tempfile::Builder::new().prefix("vdigest-whisper-").tempdir()?;

        tracing::info!(
            "Transcribing {} with whisper {} on {}",
            audio_path.display(),
            WHISPER_MODEL,
            if use_gpu { "gpu" } else { "cpu" }
        );

        let output = Command::new(&self.program)
            .args(Self::build_args(audio_path, output_dir.path(), use_gpu))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DigestError::new(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            crate::bail!("Whisper transcription failed: {}", error.trim());
        }

        let transcript_path = Self::transcript_path(audio_path, output_dir.path());
        let text = tokio::fs::read_to_string(&transcript_path).await.map_err(|e| {
            DigestError::new(format!(
                "Whisper produced no transcript at {}: {}",
                transcript_path.display(),
                e
            ))
        })?;

        let transcript = crate::utils::collapse_whitespace(&text);
        if transcript.is_empty() {
            crate::bail!("Whisper produced empty transcript");
        }

        tracing::info!("Transcription completed ({} characters)", transcript.chars().count());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_path() {
        let path = WhisperCli::transcript_path(Path::new("/tmp/job/audio.mp3"), Path::new("/tmp/job"));
        assert_eq!(path, PathBuf::from("/tmp/job/audio.txt"));
    }

    #[test]
    fn test_args_pin_model_and_device() {
        let args = WhisperCli::build_args(Path::new("a.mp3"), Path::new("/out"), false);
        let joined = args.join(" ");
        assert!(joined.starts_with("a.mp3 --model tiny"));
        assert!(joined.contains("--device cpu"));
        assert!(joined.contains("--fp16 False"));

        let gpu = WhisperCli::build_args(Path::new("a.mp3"), Path::new("/out"), true).join(" ");
        assert!(gpu.contains("--device cuda"));
        assert!(!gpu.contains("--fp16"));
    }

    #[tokio::test]
    async fn test_missing_audio_file() {
        let err = WhisperCli::default()
            .transcribe(Path::new("/definitely/not/here.mp3"), false)
            .await
            .unwrap_err();
        assert!(err.message().contains("Audio file not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_audio_directory_is_left_untouched() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in for whisper: writes "<stem>.txt" into --output_dir
        let tools = tempfile::tempdir().unwrap();
        let stub = tools.path().join("whisper");
        std::fs::write(
            &stub,
            "#!/bin/sh\naudio=\"$1\"\nshift\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--output_dir\" ]; then out=\"$2\"; fi\n  shift\ndone\nstem=$(basename \"$audio\")\necho \"spoken words here\" > \"$out/${stem%.*}.txt\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let notes = tempfile::tempdir().unwrap();
        let audio = notes.path().join("lecture.mp3");
        let existing = notes.path().join("lecture.txt");
        std::fs::write(&audio, b"not really audio").unwrap();
        std::fs::write(&existing, "my own notes").unwrap();

        let text = WhisperCli::new(stub.to_string_lossy())
            .transcribe(&audio, false)
            .await
            .unwrap();
        assert_eq!(text, "spoken words here");

        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "my own notes");
        let mut names: Vec<_> = std::fs::read_dir(notes.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["lecture.mp3", "lecture.txt"]);
    }
}
