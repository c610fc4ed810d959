//! Minimal command-line front end for redsea-dl
//!
//! ```bash
//! cargo run --example batch_cli -- [--mode audio|video|both] [--quality 320] [--out DIR] URL...
//! ```
//!
//! Ctrl+C cancels the run after the current check point.

use clap::{Parser, ValueEnum};
use redsea_dl::utils::{format_duration, short_source_label, truncate_title};
use redsea_dl::{
    AudioQuality, BatchDownloader, Config, EnqueueOutcome, Event, FetchOutputMode, ItemOutcome,
    RunOptions,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// What to fetch for every link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum Mode {
    /// MP3 audio
    #[default]
    Audio,
    /// MP4 video
    Video,
    /// Audio, then video
    Both,
}

impl From<Mode> for FetchOutputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Audio => FetchOutputMode::AudioOnly,
            Mode::Video => FetchOutputMode::VideoOnly,
            Mode::Both => FetchOutputMode::Both,
        }
    }
}

fn parse_quality(value: &str) -> Result<AudioQuality, String> {
    let kbps: u32 = value
        .parse()
        .map_err(|_| format!("not a bitrate: {value}"))?;
    AudioQuality::try_from(kbps)
}

/// Download media links and playlists one after another
#[derive(Debug, Parser)]
#[command(name = "batch_cli", version, about)]
struct Args {
    /// Output mode
    #[arg(short, long, value_enum, default_value_t = Mode::Audio)]
    mode: Mode,

    /// MP3 bitrate in kbps (128, 192, 256 or 320)
    #[arg(short, long, default_value = "192", value_parser = parse_quality)]
    quality: AudioQuality,

    /// Destination directory (default: ./downloads)
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Drop successfully downloaded links from the queue afterwards
    #[arg(long)]
    clear_completed: bool,

    /// Media links or playlist links
    #[arg(required = true, value_name = "URL")]
    sources: Vec<String>,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        let options = RunOptions::new(self.mode.into())
            .quality(self.quality)
            .clear_completed(self.clear_completed);
        match &self.out {
            Some(dir) => options.destination(dir),
            None => options,
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::RunStarted { total, mode, .. } => {
            println!("Starting {total} item(s) as {}", mode.label())
        }
        Event::ItemStarted {
            index, total, item, ..
        } => println!(
            "[{}/{}] {} ({})",
            index + 1,
            total,
            truncate_title(&item.display_title),
            short_source_label(&item.source)
        ),
        Event::SubOperationStarted { variant, .. } => println!("  fetching {variant}"),
        Event::ItemProgress {
            percent, eta_secs, ..
        } => match eta_secs {
            Some(eta) if *eta > 0 => println!("  {percent:5.1}%  eta {}", format_duration(*eta)),
            _ => println!("  {percent:5.1}%"),
        },
        Event::ItemFinished { outcome, .. } => match outcome {
            ItemOutcome::Succeeded => println!("  done"),
            ItemOutcome::Failed { error } => println!("  failed: {error}"),
            ItemOutcome::Cancelled => println!("  cancelled"),
        },
        Event::RunFinished { outcome } => {
            println!("Run {}", outcome.summary());
            for failure in &outcome.failures {
                println!("  - {}: {}", failure.item.display_title, failure.error);
            }
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("redsea_dl=info")),
        )
        .init();

    let args = Args::parse();
    let downloader = BatchDownloader::new(Config::default())?;

    for source in &args.sources {
        match downloader.enqueue(source).await {
            Ok(EnqueueOutcome::Item { item }) => {
                println!("Queued: {}", truncate_title(&item.display_title))
            }
            Ok(EnqueueOutcome::Collection { summary }) => println!(
                "Queued {} item(s) from {} ({} already queued, {} unavailable)",
                summary.added.len(),
                summary.title,
                summary.skipped_duplicates,
                summary.skipped_unavailable
            ),
            Err(e) => eprintln!("Skipping {source}: {e}"),
        }
    }

    let mut events = downloader.subscribe();
    let run = downloader.start(args.run_options()).await?;

    let canceller = downloader.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Cancelling...");
            canceller.cancel().ok();
        }
    });

    while let Ok(event) = events.recv().await {
        print_event(&event);
        if matches!(event, Event::RunFinished { .. }) {
            break;
        }
    }

    let outcome = run.wait().await?;
    downloader.shutdown().await?;
    if outcome.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
