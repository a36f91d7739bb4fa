use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::batch::VideoReport;
use crate::pipeline::{VideoDigest, VideoJob, VideoProcessor};
use crate::utils::format_duration;

const TABLE_WIDTH: usize = 96;
const LABEL_WIDTH: usize = 20;

/// Words that end a Q&A session
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "q"];

pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner on stderr, hidden when `quiet`
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(spinner_style());
    progress.set_message(message.into());
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Shows one spinner per video while a wrapped processor runs
pub struct ProgressProcessor {
    inner: Arc<dyn VideoProcessor>,
    bars: MultiProgress,
    quiet: bool,
}

impl ProgressProcessor {
    pub fn new(inner: Arc<dyn VideoProcessor>, quiet: bool) -> Self {
        Self {
            inner,
            bars: MultiProgress::new(),
            quiet,
        }
    }
}

#[async_trait]
impl VideoProcessor for ProgressProcessor {
    async fn process(&self, job: VideoJob) -> crate::Result<VideoDigest> {
        let progress = if self.quiet {
            ProgressBar::hidden()
        } else {
            let bar = self.bars.add(ProgressBar::new_spinner());
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };
        progress.set_message(format!("Processing {}", job.url));

        let url = job.url.clone();
        let started = Instant::now();
        let result = self.inner.process(job).await;
        let elapsed = format_duration(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => progress.finish_with_message(format!("Done {} in {}", url, elapsed)),
            Err(_) => progress.finish_with_message(format!("Failed {} after {}", url, elapsed)),
        }
        result
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let needed = (if line.is_empty() { 0 } else { 1 }) + word.chars().count();
        if !line.is_empty() && line.chars().count() + needed > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn push_row(out: &mut String, label: &str, value: &str) {
    let value_width = TABLE_WIDTH - LABEL_WIDTH - 3;
    let lines = wrap(value, value_width);
    let mut lines = lines.iter().map(String::as_str);

    let first = lines.next().unwrap_or("-");
    out.push_str(&format!("{:<width$} | {}\n", style(label).bold(), first, width = LABEL_WIDTH));
    for line in lines {
        out.push_str(&format!("{:<width$} | {}\n", "", line, width = LABEL_WIDTH));
    }
}

/// Two-column table for one video
pub fn format_report(report: &VideoReport, index: usize) -> String {
    let rule = "-".repeat(TABLE_WIDTH);
    let mut out = String::new();

    let status = if report.is_success() {
        style("OK").green().to_string()
    } else {
        style("FAILED").red().to_string()
    };
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Video {} [{}] {}\n", index + 1, status, style(&report.url).cyan()));
    out.push_str(&format!("{}\n", rule));

    match &report.error {
        Some(error) => push_row(&mut out, "Error", error),
        None => {
            if let Some(source) = &report.transcript_source {
                push_row(&mut out, "Transcript source", source);
            }
            push_row(&mut out, "Transcript", &report.transcript_snippet);
            push_row(&mut out, "Summary", &report.summary);
            push_row(
                &mut out,
                &format!("Translated ({})", report.language),
                &report.translated_summary,
            );
        }
    }

    out.push_str(&rule);
    out
}

pub fn print_reports(reports: &[VideoReport]) {
    for (index, report) in reports.iter().enumerate() {
        println!("{}\n", format_report(report, index));
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    println!(
        "{} videos processed, {} succeeded, {} failed",
        reports.len(),
        reports.len() - failed,
        failed
    );
}

pub fn print_json(reports: &[VideoReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).context("Failed to serialize reports")?;
    println!("{}", json);
    Ok(())
}

pub fn print_pdf_summary(path: &std::path::Path, summary: &str) {
    println!("{}", style(format!("Summary of {}", path.display())).green().bold());
    for line in wrap(summary, TABLE_WIDTH) {
        println!("{}", line);
    }
}

pub fn print_answer(answer: &crate::qa::Answer) {
    println!("{} {}", style("Answer:").green().bold(), answer.text);
    tracing::debug!("Answer confidence {:.2}", answer.score);
}

pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_COMMANDS.contains(&input.as_str())
}

/// Read the next question; `None` on EOF or an exit command. Blank lines are skipped.
pub fn read_question<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).context("Failed to read question")?;
        if read == 0 {
            return Ok(None);
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            return Ok(None);
        }
        return Ok(Some(question.to_string()));
    }
}
