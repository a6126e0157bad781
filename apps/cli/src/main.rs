use std::path::PathBuf;

use captioner_core::{CaptionSegment, CaptionService, MediaStore, Settings, TranscriptionResult};
use clap::{Parser, Subcommand};
use colored::*;
use miette::{Context, IntoDiagnostic, Result, set_panic_hook};
use terminal_size::{Width, terminal_size};

const DEFAULT_WIDTH: usize = 80;
const TEXT_INDENT: &str = "                          ";

#[derive(Parser)]
#[command(name = "captioner")]
#[command(about = "Video caption generation from the command line", version)]
struct Cli {
    /// Overrides the configured upload directory
    #[arg(short, long, global = true)]
    upload_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Resource,
}

#[derive(Subcommand)]
enum Resource {
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
    Captions {
        #[command(subcommand)]
        action: CaptionsAction,
    },
}

#[derive(Subcommand)]
enum MediaAction {
    /// Copy a local video into the upload directory
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum CaptionsAction {
    /// Transcribe a stored video and print its caption segments
    Generate {
        /// Filename returned by `media import` or the upload API
        #[arg(short, long)]
        video: String,
        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    set_panic_hook();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load()
        .into_diagnostic()
        .wrap_err("Failed to load configuration")?;
    if let Some(dir) = cli.upload_dir {
        settings.upload_dir = dir;
    }

    let store = MediaStore::from_settings(&settings).wrap_err("Failed to open upload directory")?;

    match cli.command {
        Resource::Media { action } => match action {
            MediaAction::Import { file } => {
                print_banner();
                println!("   {:<10} {}", "INPUT:".dimmed(), file.display());
                println!();

                let stored = store
                    .import_file(&file)
                    .await
                    .wrap_err("Import failed")?;

                println!("   {}", "✔ IMPORTED".green().bold());
                println!("   {:<10} {}", "Video:".dimmed(), stored.filename.yellow());
                println!("   {:<10} {} bytes", "Size:".dimmed(), stored.size);
                println!();
            }
        },
        Resource::Captions { action } => match action {
            CaptionsAction::Generate { video, json } => {
                let service = CaptionService::from_settings(&settings, store);

                if json {
                    let result = service
                        .generate_captions(&video)
                        .await
                        .wrap_err("Caption generation failed")?;
                    println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
                    return Ok(());
                }

                print_banner();
                println!("   {:<10} {}", "VIDEO:".dimmed(), video.yellow());
                println!();
                println!("   {}", "Processing Pipeline:".bold().blue());
                println!("   1. [{}] Upload", "RUNNING".yellow());
                println!("   2. [{}] Transcription", "WAITING".dimmed());
                println!();

                let result = service
                    .generate_captions(&video)
                    .await
                    .wrap_err("Caption generation failed")?;

                print_result(&result);
            }
        },
    }

    Ok(())
}

fn print_banner() {
    println!();
    println!("   {}", "CAPTIONER".bold());
    println!("   {}", "=========".dimmed());
}

fn print_result(result: &TranscriptionResult) {
    println!("   {}", "✔ CAPTIONS READY".green().bold());
    println!("   {:<10} {}", "Language:".dimmed(), result.language);
    println!("   {:<10} {:.2}s", "Duration:".dimmed(), result.duration);
    if let Some(confidence) = result.confidence {
        println!("   {:<10} {:.1}%", "Confidence:".dimmed(), confidence * 100.0);
    }
    println!("   {:<10} {}", "Segments:".dimmed(), result.captions.len());
    println!();

    let width = terminal_size()
        .map(|(Width(w), _)| usize::from(w))
        .unwrap_or(DEFAULT_WIDTH);

    for segment in &result.captions {
        print_segment(segment, width);
    }
    println!();
}

fn print_segment(segment: &CaptionSegment, width: usize) {
    let span = format!("{} → {}", timestamp(segment.start), timestamp(segment.end));
    let options = textwrap::Options::new(width.saturating_sub(TEXT_INDENT.len()).max(20));
    let mut lines = textwrap::wrap(&segment.text, options).into_iter();

    if let Some(first) = lines.next() {
        println!("   {}  {}", span.cyan(), first);
    }
    for line in lines {
        println!("{}{}", TEXT_INDENT, line);
    }
}

/// Formats seconds as `mm:ss.mmm`.
fn timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let (minutes, rest) = (total_ms / 60_000, total_ms % 60_000);
    format!("{:02}:{:02}.{:03}", minutes, rest / 1000, rest % 1000)
}
