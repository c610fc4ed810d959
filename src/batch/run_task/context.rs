//! Run context -- everything a run needs, fixed at start.

use crate::batch::cancel::RunCancellation;
use crate::engine::FetchEngine;
use crate::queue::QueueSnapshot;
use crate::types::{AudioQuality, Event, FetchOutputMode, RunId};
use std::path::PathBuf;
use std::sync::Arc;

/// Immutable state of one run
pub(crate) struct RunContext {
    pub(crate) run_id: RunId,
    /// Items to process, copied from the queue at start
    pub(crate) snapshot: QueueSnapshot,
    pub(crate) mode: FetchOutputMode,
    pub(crate) quality: AudioQuality,
    pub(crate) destination_dir: PathBuf,
    /// Drop succeeded items from the live queue after a completed run
    pub(crate) clear_completed: bool,
    /// Handed to the engine; never used to re-invoke a failed fetch
    pub(crate) retries: u32,
    pub(crate) engine: Arc<dyn FetchEngine>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    pub(crate) cancel: RunCancellation,
}

impl RunContext {
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
