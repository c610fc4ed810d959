//! Traits and types for the external fetch engine

use crate::error::EngineError;
use crate::types::{AudioQuality, FetchVariant};
use async_trait::async_trait;
use std::path::PathBuf;

/// One sub-operation handed to a fetch engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Media locator
    pub source: String,
    /// Resolved display title (output names are derived from the engine's own metadata)
    pub title: String,
    /// Directory the engine writes into
    pub destination_dir: PathBuf,
    /// Audio or video
    pub variant: FetchVariant,
    /// MP3 bitrate for audio sub-operations
    pub quality: AudioQuality,
    /// Retry count for transient network faults; the engine owns retry execution
    pub retries: u32,
}

/// Progress reported by an engine while fetching
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchProgress {
    /// Percentage of the current sub-operation (0.0 to 100.0)
    pub percent: f32,
    /// Estimated seconds remaining, if the engine knows
    pub eta_secs: Option<u64>,
}

/// Answer of a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressControl {
    /// Keep fetching
    Continue,
    /// Stop as soon as possible and return [`EngineError::Aborted`]
    Abort,
}

/// Progress callback passed to [`FetchEngine::fetch`]
pub type ProgressCallback<'a> = dyn Fn(FetchProgress) -> ProgressControl + Send + Sync + 'a;

/// What a successful fetch produced
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutput {
    /// Files the engine reported writing, when it reports them
    pub files: Vec<PathBuf>,
}

/// Trait for the external fetch/convert engine
///
/// An engine performs one sub-operation per call. It may call `on_progress`
/// any number of times; when the callback returns [`ProgressControl::Abort`]
/// the engine must stop and return [`EngineError::Aborted`]. The orchestrator
/// reports the item as cancelled only because its own token asked for the
/// stop; an `Aborted` returned without such a request is a failure. Engines
/// with long silent phases should re-report their last progress now and then
/// so an abort request is still noticed.
///
/// # Examples
///
/// ```no_run
/// use redsea_dl::engine::{FetchEngine, FetchRequest, ProgressControl, YtDlpEngine};
/// use redsea_dl::types::{AudioQuality, FetchVariant};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// let request = FetchRequest {
///     source: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
///     title: "Never Gonna Give You Up".to_string(),
///     destination_dir: PathBuf::from("./downloads"),
///     variant: FetchVariant::Audio,
///     quality: AudioQuality::Kbps192,
///     retries: 3,
/// };
///
/// let output = engine
///     .fetch(&request, &|progress| {
///         println!("{:.1}%", progress.percent);
///         ProgressControl::Continue
///     })
///     .await?;
/// println!("wrote {:?}", output.files);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Fetch one variant of one source into the request's destination directory
    ///
    /// # Errors
    ///
    /// - [`EngineError::Aborted`] when the progress callback asked to stop
    /// - [`EngineError::Launch`] when the engine could not be started
    /// - [`EngineError::Failed`] for any other failure reported by the engine
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: &ProgressCallback<'_>,
    ) -> Result<FetchOutput, EngineError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
