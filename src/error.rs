//! Error types for redsea-dl
//!
//! This module provides the error taxonomy for the library:
//! - Queue mutation errors (validation, duplicates, bad indices)
//! - Run control errors (misuse of start/cancel)
//! - Per-job errors (cooperative cancellation vs. isolated fetch failures)
//! - Fetch engine errors raised at the external tool boundary

use thiserror::Error;

/// Result type alias for redsea-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for redsea-dl
///
/// Only usage errors and infrastructure failures surface through this type.
/// Per-item fetch failures are recorded in the run outcome and never escape
/// the orchestrator loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "allowed_domains")
        key: Option<String>,
    },

    /// Queue mutation rejected
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Run control operation rejected
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// A single job failed or was cancelled
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// The fetch engine or one of its helper tools failed
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Collection expansion produced no accessible entries
    #[error("collection {locator} has no accessible entries ({unavailable} unavailable)")]
    CollectionEmpty {
        /// Collection locator that was expanded
        locator: String,
        /// Number of entries the resolver reported as unavailable
        unavailable: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (listing, probing, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Shutdown in progress - not accepting new runs
    #[error("shutdown in progress: not accepting new runs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Queue mutation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Locator is empty or does not look like a supported media link
    #[error("invalid source {locator:?}: {reason}")]
    Validation {
        /// The rejected locator
        locator: String,
        /// Why the locator was rejected
        reason: String,
    },

    /// Locator is already queued
    #[error("{locator} is already in the queue")]
    Duplicate {
        /// The duplicated locator
        locator: String,
    },

    /// Index outside the queue bounds
    #[error("index {index} out of range for queue of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Queue length at the time of the request
        len: usize,
    },
}

/// Run control errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    /// A run is already in progress
    #[error("a run is already in progress")]
    AlreadyRunning,

    /// Nothing to process
    #[error("the queue is empty")]
    EmptyQueue,

    /// No run is active
    #[error("no run is active")]
    NotRunning,
}

/// Terminal error of a single job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The run's cancellation token was observed
    #[error("cancelled")]
    Cancelled,

    /// The fetch failed; the run continues with the next item
    #[error("fetch failed: {cause}")]
    Fetch {
        /// Summary of the underlying failure
        cause: String,
    },
}

/// Errors raised by a fetch engine implementation
#[derive(Debug, Error)]
pub enum EngineError {
    /// The progress callback asked the engine to stop
    #[error("fetch aborted by progress callback")]
    Aborted,

    /// The engine ran and reported a failure
    #[error("{0}")]
    Failed(String),

    /// The engine process could not be started
    #[error("failed to launch fetch engine: {0}")]
    Launch(#[source] std::io::Error),

    /// No engine binary is available
    #[error("fetch engine unavailable: {0}")]
    Unavailable(String),
}

/// Every engine error is a fetch failure
///
/// Cancellation is decided by the run's token, never by the engine's
/// answer, so an `Aborted` that nobody asked for is a failure like any other.
impl From<EngineError> for JobError {
    fn from(err: EngineError) -> Self {
        let cause = match err {
            EngineError::Aborted => "engine aborted without a cancellation request".to_string(),
            other => other.to_string(),
        };
        JobError::Fetch { cause }
    }
}
