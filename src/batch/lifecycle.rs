//! Shutdown coordination.

use crate::error::{Error, Result, RunError};
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::BatchDownloader;

impl BatchDownloader {
    /// Gracefully shut down the orchestrator
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new runs
    /// 2. Requests cancellation of the active run, if any
    /// 3. Waits for the run to stop, up to the configured shutdown timeout
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Queue commands keep working after shutdown; only [`start`](Self::start)
    /// is rejected.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new runs");

        match self.cancel() {
            Ok(()) => tracing::info!("Requested cancellation of the active run"),
            Err(Error::Run(RunError::NotRunning)) => tracing::debug!("No active run"),
            Err(e) => return Err(e),
        }

        let timeout = self.config.events.shutdown_timeout;
        match tokio::time::timeout(timeout, self.wait_for_idle()).await {
            Ok(()) => tracing::info!("Active run stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for the active run to stop, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new runs are accepted
    pub fn is_accepting_runs(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Wait until no run is active
    pub async fn wait_for_idle(&self) {
        loop {
            let state = self.run_state();
            if !state.is_active() {
                return;
            }
            tracing::debug!(state = ?state, "Waiting for the active run to stop");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
