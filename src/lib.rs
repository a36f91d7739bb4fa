//! Video Digest - A Rust CLI tool for summarizing videos and PDFs
//!
//! This library turns YouTube videos (via captions or speech-to-text) and PDF documents
//! into summaries, translates them, and answers questions about them. The heavy lifting
//! is delegated to external tools (yt-dlp, whisper) and hosted models; this crate
//! sequences the calls and runs independent videos in parallel.

pub mod batch;
pub mod cli;
pub mod config;
pub mod inference;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod qa;
pub mod runner;
pub mod sources;
pub mod summarize;
pub mod transcribe;
pub mod translate;
pub mod utils;

pub use batch::{process_videos, VideoReport};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use pipeline::{VideoDigest, VideoJob, VideoPipeline, VideoProcessor};
pub use runner::{run_concurrent_tasks, TaskOutcome};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, DigestError>;

/// The single error kind produced by every pipeline stage.
///
/// Failures are not classified; the message is what gets shown next to the
/// video or question that failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DigestError {
    message: String,
}

impl DigestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for DigestError {
    fn from(err: anyhow::Error) -> Self {
        // Keep the whole context chain, "outer: inner"
        Self::new(format!("{:#}", err))
    }
}

impl From<std::io::Error> for DigestError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<reqwest::Error> for DigestError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Shorthand for `Err(DigestError::new(format!(...)))`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::DigestError::new(format!($($arg)*)))
    };
}
