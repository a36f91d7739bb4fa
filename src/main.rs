use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use video_digest::cli::{LogFormat, VideoOptions};
use video_digest::output::{self, ProgressProcessor};
use video_digest::pdf::{PdfDigest, SummaryCache};
use video_digest::qa::{suggest_questions, QaEngine};
use video_digest::summarize::Summarizer;
use video_digest::translate::{translator_from_config, TargetLanguage, SUPPORTED_LANGUAGES};
use video_digest::{process_videos, utils, Cli, Commands, Config, VideoPipeline, VideoReport};

fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose {
        "video_digest=debug,vdigest=debug"
    } else {
        "video_digest=info,vdigest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    // stdout is reserved for results
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Batch { urls, options } => run_videos(urls, options, cli.quiet).await?,
        Commands::Video { url, options } => run_videos(vec![url], options, cli.quiet).await?,
        Commands::Pdf { path, gpu, no_qa } => run_pdf(&path, gpu, no_qa, cli.quiet).await?,
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Run `vdigest config --show` to print the current settings.");
            }
        }
        Commands::Languages => {
            println!("Supported languages:");
            for (code, name) in SUPPORTED_LANGUAGES {
                println!("  {:<6} {}", code, name);
            }
        }
    }

    Ok(())
}

async fn warn_missing_tools(config: &Config) {
    let missing = utils::check_dependencies(&config.tools.yt_dlp, &config.tools.whisper).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}

async fn run_videos(urls: Vec<String>, options: VideoOptions, quiet: bool) -> Result<()> {
    let target: TargetLanguage = options.language.parse()?;
    if !target.is_supported() {
        tracing::warn!("Language '{}' is not in the supported list, trying anyway", target);
    }

    let config = Config::load().await?;
    warn_missing_tools(&config).await;

    let pipeline = Arc::new(VideoPipeline::from_config(&config));
    let translator = pipeline.translator();
    let processor = Arc::new(ProgressProcessor::new(pipeline, quiet || options.json));

    let order = urls.clone();
    let outcomes = process_videos(
        processor,
        urls,
        target,
        options.gpu,
        config.batch.max_workers,
        config.batch.max_videos,
    )
    .await?;

    // Outcomes arrive in completion order; show them in the order given
    let mut reports: Vec<VideoReport> = outcomes.into_iter().map(VideoReport::from).collect();
    reports.sort_by_key(|r| order.iter().position(|u| *u == r.url));

    if options.json {
        return output::print_json(&reports);
    }

    output::print_reports(&reports);

    if options.no_qa || !reports.iter().any(VideoReport::is_success) {
        return Ok(());
    }

    let qa = QaEngine::load(&config, translator)?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    for (index, report) in reports.iter().enumerate().filter(|(_, r)| r.is_success()) {
        println!(
            "\n{} {} ({})",
            style("Questions about video").bold(),
            index + 1,
            report.url
        );
        print_suggestions(&report.summary);

        while let Some(question) = prompt(&mut input)? {
            match qa.answer(&report.summary, &question, &report.language).await {
                Ok(answer) => output::print_answer(&answer),
                Err(e) => eprintln!("{} {}", style("Could not answer:").red(), e),
            }
        }
    }

    Ok(())
}

async fn run_pdf(path: &Path, gpu: bool, no_qa: bool, quiet: bool) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let config = Config::load().await?;
    if gpu {
        tracing::debug!("GPU requested; hosted and extractive models ignore it");
    }

    let summarizer = Arc::new(Summarizer::from_config(&config));
    let qa = Arc::new(QaEngine::load(&config, translator_from_config(&config.translation))?);
    let digest = PdfDigest::new(summarizer, qa);
    let mut cache = SummaryCache::new();

    let progress = output::spinner(format!("Summarizing {}", path.display()), quiet);
    let summary = digest.summarize(path, &mut cache).await;
    progress.finish_and_clear();
    let summary = summary.with_context(|| format!("Failed to summarize {}", path.display()))?;

    output::print_pdf_summary(path, &summary);

    if no_qa {
        return Ok(());
    }

    print_suggestions(&summary);
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    while let Some(question) = prompt(&mut input)? {
        match digest.ask(&summary, &question).await {
            Ok(answer) => output::print_answer(&answer),
            Err(e) => eprintln!("{} {}", style("Could not answer:").red(), e),
        }
    }

    Ok(())
}

fn print_suggestions(summary: &str) {
    println!("{}", style("You could ask:").dim());
    for suggestion in suggest_questions(summary) {
        println!("  • {}", suggestion);
    }
}

fn prompt<R: std::io::BufRead>(input: &mut R) -> Result<Option<String>> {
    print!("{} ", style("Ask a question (or type 'exit'):").yellow().bold());
    std::io::stdout().flush()?;
    output::read_question(input)
}
