//! Core types for redsea-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Title used when the metadata lookup fails or yields nothing
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One unit of work: a single media locator plus best-effort metadata
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobReference {
    /// Opaque locator (a URL)
    pub source: String,
    /// Human label; [`UNKNOWN_TITLE`] when the lookup failed
    pub display_title: String,
    /// Estimated duration in seconds (0 = unknown)
    #[serde(default)]
    pub estimated_duration: u64,
}

impl JobReference {
    /// Create a reference with a known title and unknown duration
    pub fn new(source: impl Into<String>, display_title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            display_title: display_title.into(),
            estimated_duration: 0,
        }
    }

    /// Create a reference whose title is not known yet
    pub fn untitled(source: impl Into<String>) -> Self {
        Self::new(source, UNKNOWN_TITLE)
    }

    /// Set the estimated duration in seconds
    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.estimated_duration = seconds;
        self
    }

    /// Whether the title came from a successful lookup
    pub fn has_known_title(&self) -> bool {
        self.display_title != UNKNOWN_TITLE
    }
}

/// Identifier of one run, unique per orchestrator instance
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sub-operation of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchVariant {
    /// Extract the audio track and convert it to MP3
    Audio,
    /// Download an MP4 video stream
    Video,
}

impl FetchVariant {
    /// File extension of the produced output
    pub fn extension(self) -> &'static str {
        match self {
            FetchVariant::Audio => "mp3",
            FetchVariant::Video => "mp4",
        }
    }
}

impl std::fmt::Display for FetchVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchVariant::Audio => f.write_str("audio"),
            FetchVariant::Video => f.write_str("video"),
        }
    }
}

/// Output selection for a run, fixed for the whole run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutputMode {
    /// MP3 audio only
    #[default]
    AudioOnly,
    /// MP4 video only
    VideoOnly,
    /// Audio first, then video, from the same source
    Both,
}

impl FetchOutputMode {
    /// Sub-operations performed for each job, in execution order
    pub fn variants(self) -> &'static [FetchVariant] {
        match self {
            FetchOutputMode::AudioOnly => &[FetchVariant::Audio],
            FetchOutputMode::VideoOnly => &[FetchVariant::Video],
            FetchOutputMode::Both => &[FetchVariant::Audio, FetchVariant::Video],
        }
    }

    /// Short label for logs and summaries
    pub fn label(self) -> &'static str {
        match self {
            FetchOutputMode::AudioOnly => "MP3 audio",
            FetchOutputMode::VideoOnly => "MP4 video",
            FetchOutputMode::Both => "MP3 + MP4",
        }
    }
}

/// MP3 bitrate used by audio sub-operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AudioQuality {
    /// 128 kbps
    Kbps128,
    /// 192 kbps
    #[default]
    Kbps192,
    /// 256 kbps
    Kbps256,
    /// 320 kbps
    Kbps320,
}

impl AudioQuality {
    /// Bitrate in kilobits per second
    pub fn kbps(self) -> u32 {
        match self {
            AudioQuality::Kbps128 => 128,
            AudioQuality::Kbps192 => 192,
            AudioQuality::Kbps256 => 256,
            AudioQuality::Kbps320 => 320,
        }
    }
}

impl TryFrom<u32> for AudioQuality {
    type Error = String;

    fn try_from(kbps: u32) -> Result<Self, Self::Error> {
        match kbps {
            128 => Ok(AudioQuality::Kbps128),
            192 => Ok(AudioQuality::Kbps192),
            256 => Ok(AudioQuality::Kbps256),
            320 => Ok(AudioQuality::Kbps320),
            other => Err(format!(
                "unsupported audio quality {other} kbps (expected 128, 192, 256 or 320)"
            )),
        }
    }
}

impl From<AudioQuality> for u32 {
    fn from(quality: AudioQuality) -> Self {
        quality.kbps()
    }
}

/// Orchestrator run state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run in progress
    #[default]
    Idle,
    /// A run is iterating its snapshot
    Running,
    /// A run is active and cancellation has been requested
    CancelRequested,
}

impl RunState {
    /// Whether a run is in progress (cancelling or not)
    pub fn is_active(self) -> bool {
        !matches!(self, RunState::Idle)
    }
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every item of the snapshot was attempted
    Completed,
    /// Iteration stopped because cancellation was requested
    Cancelled,
}

/// Result of a single item, as reported in [`Event::ItemFinished`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// All sub-operations succeeded
    Succeeded,
    /// The fetch failed; the run moved on
    Failed {
        /// Error summary
        error: String,
    },
    /// Cancellation was observed while the item was in progress
    Cancelled,
}

/// A failed item recorded in the run outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Position in the run snapshot
    pub index: usize,
    /// The failed item
    pub item: JobReference,
    /// Error summary
    pub error: String,
}

/// Aggregate result of one run
///
/// Available whether the run completed or was cancelled, so a caller can
/// always present counts and failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier
    pub run_id: RunId,
    /// Completed or cancelled
    pub status: RunStatus,
    /// Output mode used for the run
    pub mode: FetchOutputMode,
    /// Items in the run snapshot
    pub total: usize,
    /// Items handed to the job executor
    pub attempted: usize,
    /// Items whose sub-operations all succeeded
    pub succeeded: usize,
    /// Items that failed with a fetch error
    pub failed: usize,
    /// Failed items with their error summaries, in run order
    pub failures: Vec<JobFailure>,
    /// Items that succeeded, in run order
    pub completed: Vec<JobReference>,
    /// The item in progress when cancellation was observed, if any
    pub interrupted: Option<JobReference>,
    /// Destination directory of the run
    pub destination_dir: PathBuf,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub(crate) fn begin(
        run_id: RunId,
        mode: FetchOutputMode,
        total: usize,
        destination_dir: PathBuf,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            status: RunStatus::Completed,
            mode,
            total,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            completed: Vec::new(),
            interrupted: None,
            destination_dir,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn record_success(&mut self, item: &JobReference) {
        self.succeeded += 1;
        self.completed.push(item.clone());
    }

    pub(crate) fn record_failure(&mut self, index: usize, item: &JobReference, error: String) {
        self.failed += 1;
        self.failures.push(JobFailure {
            index,
            item: item.clone(),
            error,
        });
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Utc::now();
    }

    /// Whether the run stopped on a cancellation request
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    /// Items of the snapshot the executor never saw
    pub fn not_attempted(&self) -> usize {
        self.total.saturating_sub(self.attempted)
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// One-line summary distinguishing completed and cancelled runs
    pub fn summary(&self) -> String {
        match self.status {
            RunStatus::Completed => format!(
                "completed: {} of {} succeeded, {} failed",
                self.succeeded, self.total, self.failed
            ),
            RunStatus::Cancelled => format!(
                "cancelled, {} completed before stop ({} failed, {} not attempted)",
                self.succeeded,
                self.failed,
                self.not_attempted()
            ),
        }
    }
}

/// Options for one run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Output mode for every item in the run
    #[serde(default)]
    pub mode: FetchOutputMode,
    /// MP3 bitrate for audio sub-operations
    #[serde(default)]
    pub quality: AudioQuality,
    /// Destination directory (None = configured default)
    #[serde(default)]
    pub destination_dir: Option<PathBuf>,
    /// Remove successfully completed items from the live queue after a
    /// run that was not cancelled
    #[serde(default)]
    pub clear_completed: bool,
}

impl RunOptions {
    /// Options for the given mode with default quality and destination
    pub fn new(mode: FetchOutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the MP3 bitrate
    pub fn quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the destination directory
    pub fn destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = Some(dir.into());
        self
    }

    /// Remove completed items from the live queue after the run
    pub fn clear_completed(mut self, clear: bool) -> Self {
        self.clear_completed = clear;
        self
    }
}

/// Result of expanding a collection into the queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Collection locator
    pub source: String,
    /// Collection title reported by the resolver
    pub title: String,
    /// Items appended to the queue
    pub added: Vec<JobReference>,
    /// Entries skipped because they were already queued
    pub skipped_duplicates: usize,
    /// Entries skipped because the resolver reported them unavailable
    pub skipped_unavailable: usize,
}

/// What an enqueue request added
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// A single item was appended
    Item {
        /// The appended item
        item: JobReference,
    },
    /// A collection was expanded
    Collection {
        /// Expansion summary
        summary: CollectionSummary,
    },
}

/// Event emitted by the orchestrator
///
/// Within a run, events arrive in order: `RunStarted`, then for each item
/// `ItemStarted`, any `SubOperationStarted`/`ItemProgress`, `ItemFinished`,
/// and finally `RunFinished`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The live queue changed
    QueueChanged {
        /// New queue length
        len: usize,
    },

    /// A single item was appended to the queue
    ItemQueued {
        /// The appended item
        item: JobReference,
    },

    /// A collection was expanded into the queue
    CollectionExpanded {
        /// Collection title
        title: String,
        /// Items appended
        added: usize,
        /// Entries already queued
        skipped_duplicates: usize,
        /// Entries reported unavailable
        skipped_unavailable: usize,
    },

    /// A run started
    RunStarted {
        /// Run identifier
        run_id: RunId,
        /// Items in the snapshot
        total: usize,
        /// Output mode
        mode: FetchOutputMode,
    },

    /// An item was handed to the job executor
    ItemStarted {
        /// Run identifier
        run_id: RunId,
        /// Position in the snapshot
        index: usize,
        /// Items in the snapshot
        total: usize,
        /// The item
        item: JobReference,
    },

    /// A sub-operation (audio or video) of the current item started
    SubOperationStarted {
        /// Run identifier
        run_id: RunId,
        /// Position in the snapshot
        index: usize,
        /// Which sub-operation
        variant: FetchVariant,
    },

    /// Progress reported by the fetch engine
    ItemProgress {
        /// Run identifier
        run_id: RunId,
        /// Position in the snapshot
        index: usize,
        /// Which sub-operation
        variant: FetchVariant,
        /// Percentage of the current sub-operation (0.0 to 100.0)
        percent: f32,
        /// Estimated seconds remaining, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        eta_secs: Option<u64>,
    },

    /// An item reached a terminal state
    ItemFinished {
        /// Run identifier
        run_id: RunId,
        /// Position in the snapshot
        index: usize,
        /// Items in the snapshot
        total: usize,
        /// The item
        item: JobReference,
        /// What happened
        outcome: ItemOutcome,
    },

    /// Terminal event of a run, emitted after the orchestrator is idle again
    RunFinished {
        /// Aggregate result
        outcome: RunOutcome,
    },

    /// The orchestrator shut down
    Shutdown,
}
