//! Test backends built only on the public API, and fake tool scripts

use async_trait::async_trait;
use redsea_dl::engine::{FetchOutput, FetchProgress, FetchRequest, ProgressCallback, ProgressControl};
use redsea_dl::metadata::CollectionListing;
use redsea_dl::{CollectionResolver, EngineError, Error, FetchEngine, TitleResolver, UNKNOWN_TITLE};
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Marker in a locator that makes [`FileWritingEngine`] fail
pub const FAIL_MARKER: &str = "fail";

/// Marker in a locator that makes [`FileWritingEngine`] run until aborted
pub const STALL_MARKER: &str = "stall";

/// Engine writing `<destination>/<title>.<ext>` for every request
///
/// Locators containing [`FAIL_MARKER`] fail; locators containing
/// [`STALL_MARKER`] report progress until the callback aborts.
#[derive(Default)]
pub struct FileWritingEngine {
    requests: Mutex<Vec<FetchRequest>>,
}

impl FileWritingEngine {
    /// Every request received, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

#[async_trait]
impl FetchEngine for FileWritingEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: &ProgressCallback<'_>,
    ) -> Result<FetchOutput, EngineError> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());

        if request.source.contains(STALL_MARKER) {
            let mut percent = 0.0_f32;
            loop {
                let progress = FetchProgress {
                    percent,
                    eta_secs: None,
                };
                if on_progress(progress) == ProgressControl::Abort {
                    return Err(EngineError::Aborted);
                }
                percent = (percent + 5.0).min(95.0);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        if request.source.contains(FAIL_MARKER) {
            return Err(EngineError::Failed(format!(
                "[youtube] {}: Video unavailable",
                request.source
            )));
        }

        let path = request
            .destination_dir
            .join(format!("{}.{}", request.title, request.variant.extension()));
        tokio::fs::write(&path, request.source.as_bytes())
            .await
            .map_err(|e| EngineError::Failed(e.to_string()))?;

        for percent in [0.0, 100.0] {
            let progress = FetchProgress {
                percent,
                eta_secs: Some(0),
            };
            if on_progress(progress) == ProgressControl::Abort {
                return Err(EngineError::Aborted);
            }
        }

        Ok(FetchOutput { files: vec![path] })
    }

    fn name(&self) -> &'static str {
        "file-writer"
    }
}

/// Title resolver that never knows a title
pub struct NoTitles;

#[async_trait]
impl TitleResolver for NoTitles {
    async fn resolve_title(&self, _source: &str) -> String {
        UNKNOWN_TITLE.to_string()
    }
}

/// Collection resolver that rejects every listing
pub struct NoCollections;

#[async_trait]
impl CollectionResolver for NoCollections {
    async fn list(&self, source: &str) -> redsea_dl::Result<CollectionListing> {
        Err(Error::ExternalTool(format!("listing disabled for {source}")))
    }
}

/// Write an executable shell script standing in for yt-dlp
#[cfg(unix)]
pub fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark script executable");
    path
}
