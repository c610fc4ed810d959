//! Test configuration helpers: temp-dir configs and live tool discovery

use redsea_dl::{Backends, BatchDownloader, Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::fixtures::{FileWritingEngine, NoCollections, NoTitles};

/// Config writing into `temp_dir/downloads` with a short shutdown timeout
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.destination_dir = temp_dir.path().join("downloads");
    config.events.shutdown_timeout = Duration::from_secs(5);
    config
}

/// Downloader backed by [`FileWritingEngine`], plus its temp dir
pub fn create_file_downloader() -> (BatchDownloader, Arc<FileWritingEngine>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let engine = Arc::new(FileWritingEngine::default());
    let backends = Backends {
        engine: engine.clone(),
        titles: Arc::new(NoTitles),
        collections: Arc::new(NoCollections),
    };
    let downloader = BatchDownloader::with_backends(test_config(&temp_dir), backends)
        .expect("Failed to create downloader");
    (downloader, engine, temp_dir)
}

/// yt-dlp binary for live tests
///
/// `REDSEA_YTDLP` (from the environment or a `.env` file) wins over PATH.
pub fn live_ytdlp_path() -> Option<PathBuf> {
    dotenvy::dotenv().ok();

    std::env::var_os("REDSEA_YTDLP")
        .map(PathBuf::from)
        .or_else(|| which::which("yt-dlp").ok())
}

/// Whether live tests can run on this machine
pub fn has_live_tools() -> bool {
    live_ytdlp_path().is_some()
}

/// Downloader wired to the real tools and network
pub fn create_live_downloader() -> Result<(BatchDownloader, TempDir), String> {
    let temp_dir = tempfile::tempdir().map_err(|e| format!("Failed to create temp dir: {}", e))?;

    let mut config = test_config(&temp_dir);
    config.tools.ytdlp_path = live_ytdlp_path();
    config.events.shutdown_timeout = Duration::from_secs(30);

    let downloader =
        BatchDownloader::new(config).map_err(|e| format!("Failed to create downloader: {}", e))?;
    Ok((downloader, temp_dir))
}
