//! Transcribe a local audio file with whisper and report the text as a JSON line on stdout.
//!
//! Usage: `vdigest-transcribe <AUDIO_PATH>`. Exits non-zero on failure.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use video_digest::sources::ScriptResponse;
use video_digest::transcribe::{SpeechToText, WhisperCli};
use video_digest::Config;

async fn transcribe(audio_path: &Path) -> video_digest::Result<String> {
    let config = Config::read_or_default();
    let text = WhisperCli::new(config.tools.whisper).transcribe(audio_path, false).await?;

    if text.trim().is_empty() {
        video_digest::bail!("No speech detected in {}", audio_path.display());
    }
    Ok(text)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "video_digest=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let response = match args.as_slice() {
        [path] => match transcribe(Path::new(path)).await {
            Ok(text) => ScriptResponse::transcript(text),
            Err(e) => ScriptResponse::failure(format!("Transcription failed: {}", e)),
        },
        _ => ScriptResponse::failure("Usage: vdigest-transcribe <AUDIO_PATH>"),
    };

    std::process::exit(response.emit());
}
