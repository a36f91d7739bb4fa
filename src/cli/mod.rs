use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vdigest",
    about = "Video Digest - Summarize, translate and question YouTube videos and PDFs",
    version,
    long_about = "Fetches captions (or transcribes the audio with whisper) for one or more YouTube videos, summarizes the transcripts, translates the summaries and answers questions about them. PDFs are summarized from their text layer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize several videos in parallel
    Batch {
        /// Video URLs
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        options: VideoOptions,
    },

    /// Summarize a single video
    Video {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        options: VideoOptions,
    },

    /// Summarize a PDF and ask questions about it
    Pdf {
        /// Path to the PDF file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Use the GPU where a local model runs
        #[arg(long)]
        gpu: bool,

        /// Skip the question and answer session
        #[arg(long)]
        no_qa: bool,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported language codes
    Languages,
}

#[derive(Args, Clone, Debug)]
pub struct VideoOptions {
    /// Target language code for summaries and answers, or "auto"
    #[arg(short, long, value_name = "LANG", default_value = "auto")]
    pub language: String,

    /// Run whisper on the GPU
    #[arg(long)]
    pub gpu: bool,

    /// Print the reports as JSON (implies --no-qa)
    #[arg(long)]
    pub json: bool,

    /// Skip the question and answer session
    #[arg(long)]
    pub no_qa: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}
