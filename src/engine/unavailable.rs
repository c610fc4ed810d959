//! Stand-in engine used when yt-dlp cannot be found

use super::traits::{FetchEngine, FetchOutput, FetchRequest, ProgressCallback};
use crate::error::{EngineError, Error};
use crate::metadata::{CollectionListing, CollectionResolver};
use async_trait::async_trait;

const HINT: &str = "fetching requires the external yt-dlp binary. \
                    Configure ytdlp_path in config or ensure yt-dlp is in PATH.";

/// Engine that fails every request
///
/// Lets the orchestrator start and manage its queue without yt-dlp; each
/// item of a run then fails with an isolated fetch error, and collection
/// expansion fails with [`Error::ExternalTool`].
///
/// # Examples
///
/// ```
/// use redsea_dl::engine::{FetchEngine, UnavailableEngine};
///
/// let engine = UnavailableEngine;
/// assert_eq!(engine.name(), "unavailable");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

#[async_trait]
impl FetchEngine for UnavailableEngine {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        _on_progress: &ProgressCallback<'_>,
    ) -> Result<FetchOutput, EngineError> {
        Err(EngineError::Unavailable(HINT.into()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[async_trait]
impl CollectionResolver for UnavailableEngine {
    async fn list(&self, _source: &str) -> crate::Result<CollectionListing> {
        Err(Error::ExternalTool(format!("collection listing {HINT}")))
    }
}
