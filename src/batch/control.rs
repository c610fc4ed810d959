//! Run lifecycle control: start, cancel, state.

use crate::error::{Error, Result, RunError};
use crate::types::{RunId, RunOptions, RunOutcome, RunState};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

use super::BatchDownloader;
use super::cancel::RunCancellation;
use super::run_task::{RunContext, run_worker};

/// Run state plus the token of the active run
///
/// Every transition goes through this type while its lock is held, so two
/// callers can never both observe `Idle` and start a run.
#[derive(Debug, Default)]
pub(crate) struct RunSlot {
    state: RunState,
    active: Option<(RunId, RunCancellation)>,
    next_run_id: u64,
}

impl RunSlot {
    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    /// Idle -> Running, minting a fresh token
    pub(crate) fn begin(&mut self) -> std::result::Result<(RunId, RunCancellation), RunError> {
        if self.state.is_active() {
            return Err(RunError::AlreadyRunning);
        }
        self.next_run_id += 1;
        let run_id = RunId(self.next_run_id);
        let cancel = RunCancellation::new();
        self.state = RunState::Running;
        self.active = Some((run_id, cancel.clone()));
        Ok((run_id, cancel))
    }

    /// Running/CancelRequested -> CancelRequested
    pub(crate) fn request_cancel(&mut self) -> std::result::Result<RunId, RunError> {
        match (&self.active, self.state) {
            (Some((run_id, cancel)), RunState::Running | RunState::CancelRequested) => {
                cancel.request();
                self.state = RunState::CancelRequested;
                Ok(*run_id)
            }
            _ => Err(RunError::NotRunning),
        }
    }

    /// Any -> Idle, only for the run that owns the slot
    pub(crate) fn release(&mut self, run_id: RunId) -> bool {
        match &self.active {
            Some((active, _)) if *active == run_id => {
                self.state = RunState::Idle;
                self.active = None;
                true
            }
            _ => false,
        }
    }
}

/// Returns the slot to Idle when the run worker ends, however it ends
pub(crate) struct RunGuard {
    slot: Arc<parking_lot::Mutex<RunSlot>>,
    run_id: RunId,
}

impl RunGuard {
    pub(crate) fn new(slot: Arc<parking_lot::Mutex<RunSlot>>, run_id: RunId) -> Self {
        Self { slot, run_id }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.slot.lock().release(self.run_id) && std::thread::panicking() {
            tracing::error!(run_id = %self.run_id, "Run worker panicked; state reset to idle");
        }
    }
}

/// Handle to a started run
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Identifier of the run
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Whether the run worker has finished
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end and return its outcome
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the run worker panicked. The orchestrator
    /// is idle again in that case.
    pub async fn wait(self) -> Result<RunOutcome> {
        self.join
            .await
            .map_err(|e| Error::Other(format!("run worker failed: {}", e)))
    }
}

impl BatchDownloader {
    /// Start processing a snapshot of the queue
    ///
    /// The snapshot is taken now; later queue edits do not affect this run.
    /// The destination directory is created if missing. Returns immediately;
    /// progress arrives as events and the outcome through [`RunHandle::wait`].
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`RunError::AlreadyRunning`] if a run is active (including one being cancelled)
    /// - [`RunError::EmptyQueue`] if there is nothing to process
    /// - [`Error::Io`] if the destination directory cannot be created
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use redsea_dl::*;
    /// # async fn example(downloader: BatchDownloader) -> Result<()> {
    /// downloader.enqueue("https://youtu.be/dQw4w9WgXcQ").await?;
    /// let run = downloader.start(RunOptions::new(FetchOutputMode::Both)).await?;
    /// let outcome = run.wait().await?;
    /// println!("{}", outcome.summary());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self, options: RunOptions) -> Result<RunHandle> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if self.run_state().is_active() {
            return Err(RunError::AlreadyRunning.into());
        }

        let snapshot = self.queue_snapshot().await;
        if snapshot.is_empty() {
            return Err(RunError::EmptyQueue.into());
        }

        let destination_dir = options
            .destination_dir
            .clone()
            .unwrap_or_else(|| self.config.download.destination_dir.clone());
        tokio::fs::create_dir_all(&destination_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create destination directory '{}': {}",
                        destination_dir.display(),
                        e
                    ),
                ))
            })?;

        let (run_id, cancel) = self.run_slot.lock().begin()?;
        let guard = RunGuard::new(self.run_slot.clone(), run_id);

        tracing::info!(
            run_id = %run_id,
            items = snapshot.len(),
            mode = options.mode.label(),
            destination = %destination_dir.display(),
            "Starting run"
        );

        let ctx = RunContext {
            run_id,
            snapshot,
            mode: options.mode,
            quality: options.quality,
            destination_dir,
            clear_completed: options.clear_completed,
            retries: self.config.download.retries,
            engine: self.backends.engine.clone(),
            event_tx: self.event_tx.clone(),
            cancel,
        };

        let downloader = self.clone();
        let join = tokio::spawn(async move { run_worker(downloader, ctx, guard).await });

        Ok(RunHandle { run_id, join })
    }

    /// Request cancellation of the active run
    ///
    /// Safe to call from any context and more than once. The run stops at its
    /// next check point; the item in progress is aborted through the engine's
    /// progress hook, and no later item is started.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NotRunning`] when no run is active.
    pub fn cancel(&self) -> Result<()> {
        let run_id = self.run_slot.lock().request_cancel()?;
        tracing::info!(run_id = %run_id, "Cancellation requested");
        Ok(())
    }

    /// Current run state
    pub fn run_state(&self) -> RunState {
        self.run_slot.lock().state()
    }

    /// Whether a run is active (running or being cancelled)
    pub fn is_running(&self) -> bool {
        self.run_state().is_active()
    }
}
