//! # redsea-dl
//!
//! Sequential, cancellable batch downloads of media links and playlists.
//!
//! Locators are collected in an ordered, duplicate-free queue. A run takes a
//! snapshot of the queue and hands the items to an external fetch engine
//! (yt-dlp by default) one at a time, producing MP3 audio, MP4 video or both.
//! A failing item is recorded and skipped; a cancellation request stops the
//! run at the next check point.
//!
//! The crate has no UI. Consumers drive it through [`BatchDownloader`] and
//! observe it through [`Event`]s.
//!
//! ## Quick Start
//!
//! ```no_run
//! use redsea_dl::{BatchDownloader, Config, FetchOutputMode, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config::default())?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader.enqueue("https://youtu.be/dQw4w9WgXcQ").await?;
//!     downloader
//!         .enqueue("https://www.youtube.com/playlist?list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI")
//!         .await?;
//!
//!     let run = downloader.start(RunOptions::new(FetchOutputMode::Both)).await?;
//!     let outcome = run.wait().await?;
//!     println!("{}", outcome.summary());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch orchestrator (decomposed into focused submodules)
pub mod batch;
/// Configuration types
pub mod config;
/// Fetch engine seam and the yt-dlp implementation
pub mod engine;
/// Error types
pub mod error;
/// Title and collection lookups
pub mod metadata;
/// Ordered, duplicate-free job queue
pub mod queue;
/// Locator shape checks
pub mod source;
/// Core types and events
pub mod types;
/// Display helpers
pub mod utils;

// Re-export commonly used types
pub use batch::{Backends, BatchDownloader, RunCancellation, RunHandle};
pub use config::{Config, DownloadConfig, EventConfig, MetadataConfig, SourceConfig, ToolsConfig};
pub use engine::{FetchEngine, UnavailableEngine, YtDlpEngine};
pub use error::{EngineError, Error, JobError, QueueError, Result, RunError};
pub use metadata::{CollectionResolver, HttpTitleResolver, TitleResolver, YtDlpCollectionResolver};
pub use queue::{DownloadQueue, QueueSnapshot};
pub use types::{
    AudioQuality, CollectionSummary, EnqueueOutcome, Event, FetchOutputMode, FetchVariant,
    ItemOutcome, JobFailure, JobReference, RunId, RunOptions, RunOutcome, RunState, RunStatus,
    UNKNOWN_TITLE,
};

/// Run until a termination signal arrives, then shut the orchestrator down.
///
/// Waits for a signal and then calls [`BatchDownloader::shutdown`], which
/// cancels any active run.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use redsea_dl::{BatchDownloader, Config, RunOptions, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = BatchDownloader::new(Config::default())?;
///     downloader.enqueue("https://youtu.be/dQw4w9WgXcQ").await?;
///     downloader.start(RunOptions::default()).await?;
///
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: BatchDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
fn register_signal(
    kind: tokio::signal::unix::SignalKind,
    name: &'static str,
) -> Option<tokio::signal::unix::Signal> {
    tokio::signal::unix::signal(kind)
        .inspect_err(|e| tracing::warn!(signal = name, error = %e, "Could not register signal handler"))
        .ok()
}

/// Resolves on the next delivery, never for a handler that failed to register
#[cfg(unix)]
async fn next_signal(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::SignalKind;

    let mut sigterm = register_signal(SignalKind::terminate(), "SIGTERM");
    let mut sigint = register_signal(SignalKind::interrupt(), "SIGINT");

    if sigterm.is_none() && sigint.is_none() {
        tracing::error!("No signal handler could be registered, falling back to ctrl_c");
        tokio::signal::ctrl_c().await.ok();
        return;
    }

    tokio::select! {
        _ = next_signal(&mut sigterm) => tracing::info!("Received SIGTERM, shutting down"),
        _ = next_signal(&mut sigint) => tracing::info!("Received SIGINT, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
