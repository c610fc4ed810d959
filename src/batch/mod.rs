//! Batch orchestrator split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Queue commands (enqueue, dequeue, clear, snapshot)
//! - [`collection`] - Collection (playlist) expansion
//! - [`control`] - Run lifecycle control (start/cancel/state)
//! - [`cancel`] - Per-run cancellation token
//! - [`lifecycle`] - Shutdown coordination
//! - [`run_task`] - Run worker: sequential loop and job execution

mod cancel;
mod collection;
mod control;
mod lifecycle;
mod queue;
mod run_task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cancel::RunCancellation;
pub use control::RunHandle;

use crate::config::Config;
use crate::engine::{FetchEngine, UnavailableEngine, YtDlpEngine};
use crate::error::Result;
use crate::metadata::{
    CollectionResolver, HttpTitleResolver, TitleResolver, YtDlpCollectionResolver,
};
use crate::queue::DownloadQueue;
use crate::source::SourceRules;
use crate::types::Event;
use control::RunSlot;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// External services the orchestrator depends on
///
/// [`Backends::from_config`] wires the real implementations; tests and
/// embedders can substitute their own.
#[derive(Clone)]
pub struct Backends {
    /// Fetch/convert engine
    pub engine: Arc<dyn FetchEngine>,
    /// Title lookup for single items
    pub titles: Arc<dyn TitleResolver>,
    /// Collection listing
    pub collections: Arc<dyn CollectionResolver>,
}

impl Backends {
    /// Wire yt-dlp and the HTTP title resolver from configuration
    ///
    /// When yt-dlp cannot be located the orchestrator still works, but every
    /// fetch fails and collection expansion is rejected.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (engine, collections): (Arc<dyn FetchEngine>, Arc<dyn CollectionResolver>) =
            match (
                YtDlpEngine::from_config(&config.tools),
                YtDlpCollectionResolver::from_config(&config.tools, &config.metadata),
            ) {
                (Some(engine), Some(collections)) => (
                    Arc::new(engine.with_user_agent(config.metadata.user_agent.clone())),
                    Arc::new(collections),
                ),
                _ => {
                    tracing::warn!(
                        "yt-dlp not found; fetching and collection expansion are unavailable"
                    );
                    (Arc::new(UnavailableEngine), Arc::new(UnavailableEngine))
                }
            };

        let titles: Arc<dyn TitleResolver> = Arc::new(HttpTitleResolver::new(&config.metadata)?);

        tracing::info!(engine = engine.name(), "Fetch engine initialized");

        Ok(Self {
            engine,
            titles,
            collections,
        })
    }
}

/// Sequential batch download orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Owns the live queue and the run state. At most one run is active at a
/// time; a run processes an immutable snapshot of the queue in order, one
/// item at a time, and can be cancelled cooperatively.
#[derive(Clone)]
pub struct BatchDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Live queue (protected by Mutex)
    pub(crate) queue: Arc<tokio::sync::Mutex<DownloadQueue>>,
    /// Run state, active run id and its cancellation token
    pub(crate) run_slot: Arc<parking_lot::Mutex<RunSlot>>,
    /// Engine and metadata services
    pub(crate) backends: Backends,
    /// Flag to indicate whether new runs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl BatchDownloader {
    /// Create a new BatchDownloader with backends discovered from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backends = Backends::from_config(&config)?;
        Ok(Self::build(config, backends))
    }

    /// Create a new BatchDownloader with explicit backends
    pub fn with_backends(config: Config, backends: Backends) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, backends))
    }

    fn build(config: Config, backends: Backends) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.events.event_buffer);
        let rules = SourceRules::from_config(&config.sources);

        Self {
            event_tx,
            config: Arc::new(config),
            queue: Arc::new(tokio::sync::Mutex::new(DownloadQueue::new(rules))),
            run_slot: Arc::new(parking_lot::Mutex::new(RunSlot::default())),
            backends,
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Subscribe to orchestrator events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than the configured buffer receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use redsea_dl::{BatchDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = BatchDownloader::new(Config::default())?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Events as a stream, skipping over lagged gaps
    pub fn event_stream(&self) -> impl tokio_stream::Stream<Item = Event> + Send + 'static {
        use tokio_stream::StreamExt;
        use tokio_stream::wrappers::BroadcastStream;
        use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

        BroadcastStream::new(self.event_tx.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event subscriber lagged");
                None
            }
        })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the fetch engine in use
    pub fn engine_name(&self) -> &'static str {
        self.backends.engine.name()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
