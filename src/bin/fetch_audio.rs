//! Download the audio track of a video and report the file as a JSON line on stdout.
//!
//! Usage: `vdigest-fetch-audio <URL>`. Exits non-zero on failure.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use video_digest::sources::{
    download_to_owned_dir, FallbackDownloader, ScriptDownloader, ScriptResponse, YtDlpDownloader,
};
use video_digest::utils::validate_and_normalize_url;
use video_digest::Config;

async fn fetch(url: &str) -> video_digest::Result<std::path::PathBuf> {
    let url = validate_and_normalize_url(url)?;
    let config = Config::read_or_default();

    let mut downloader =
        FallbackDownloader::new().with(Box::new(YtDlpDownloader::new(config.tools.yt_dlp.clone())));
    if let Some(script) = &config.tools.pytube_script {
        downloader.register(Box::new(ScriptDownloader::new(config.tools.python.clone(), script.clone())));
    }

    // On success the directory is left for the caller, who owns cleanup
    let root = config.app.temp_dir.unwrap_or_else(std::env::temp_dir);
    download_to_owned_dir(&downloader, &url, &root).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "video_digest=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let response = match args.as_slice() {
        [url] => match fetch(url).await {
            Ok(path) => ScriptResponse::audio(path),
            Err(e) => ScriptResponse::failure(format!("Audio download failed: {}", e)),
        },
        _ => ScriptResponse::failure("Usage: vdigest-fetch-audio <URL>"),
    };

    std::process::exit(response.emit());
}
