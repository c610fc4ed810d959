//! Per-run cancellation token.

use tokio_util::sync::CancellationToken;

/// One-shot cancellation signal owned by a single run
///
/// A fresh token is minted when a run starts, so a stale request can never
/// leak into the next run. Requesting is idempotent and there is no reset.
#[derive(Clone, Debug, Default)]
pub struct RunCancellation {
    token: CancellationToken,
}

impl RunCancellation {
    /// Create an unrequested token
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at its next check point
    pub fn request(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub async fn requested(&self) {
        self.token.cancelled().await
    }
}
