//! Configuration types for redsea-dl

use crate::error::{Error, Result};
use crate::types::{AudioQuality, FetchOutputMode, RunOptions};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Download behavior configuration (destination, format, retries)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination directory (default: "./downloads"), created on run start if absent
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    /// Output mode used when the caller does not pick one (default: audio only)
    #[serde(default)]
    pub default_mode: FetchOutputMode,

    /// MP3 bitrate for audio sub-operations (default: 192)
    #[serde(default)]
    pub audio_quality: AudioQuality,

    /// Retry count handed to the fetch engine for transient network faults (default: 3)
    ///
    /// The engine owns retry execution; the orchestrator never re-invokes a failed fetch.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_destination_dir(),
            default_mode: FetchOutputMode::default(),
            audio_quality: AudioQuality::default(),
            retries: default_retries(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths are not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Metadata lookup settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Upper bound for a single title lookup (default: 5 seconds)
    #[serde(default = "default_title_timeout", with = "duration_serde")]
    pub title_timeout: Duration,

    /// User-Agent header sent by lookups and the fetch engine
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            title_timeout: default_title_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Coarse locator rules
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Hosts accepted by the shape check; subdomains match too
    /// (default: youtube.com, youtu.be)
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Substrings that mark a locator as a collection (default: "playlist", "list=")
    #[serde(default = "default_collection_markers")]
    pub collection_markers: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
            collection_markers: default_collection_markers(),
        }
    }
}

/// Event delivery and shutdown settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast buffer size; slow subscribers lag beyond this (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// How long shutdown waits for an active run to stop (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Main configuration for BatchDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) - destination, format, retries
/// - [`tools`](ToolsConfig) - external binary paths
/// - [`metadata`](MetadataConfig) - title lookup
/// - [`sources`](SourceConfig) - locator shape rules
/// - [`events`](EventConfig) - event buffer, shutdown
///
/// All sub-config fields are flattened, so the JSON/TOML form has no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Metadata lookup settings
    #[serde(flatten)]
    pub metadata: MetadataConfig,

    /// Locator rules
    #[serde(flatten)]
    pub sources: SourceConfig,

    /// Event and shutdown settings
    #[serde(flatten)]
    pub events: EventConfig,
}

impl Config {
    /// Destination directory
    pub fn destination_dir(&self) -> &PathBuf {
        &self.download.destination_dir
    }

    /// Run options built from the configured defaults
    pub fn default_run_options(&self) -> RunOptions {
        RunOptions::new(self.download.default_mode).quality(self.download.audio_quality)
    }

    /// Check settings that would make the orchestrator unusable
    pub fn validate(&self) -> Result<()> {
        if self.sources.allowed_domains.is_empty() {
            return Err(Error::Config {
                message: "at least one allowed domain is required".to_string(),
                key: Some("allowed_domains".to_string()),
            });
        }
        if self.events.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must be greater than zero".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        if self.metadata.title_timeout.is_zero() {
            return Err(Error::Config {
                message: "title lookup timeout must be greater than zero".to_string(),
                key: Some("title_timeout".to_string()),
            });
        }
        Ok(())
    }
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_title_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_allowed_domains() -> Vec<String> {
    vec!["youtube.com".to_string(), "youtu.be".to_string()]
}

fn default_collection_markers() -> Vec<String> {
    vec!["playlist".to_string(), "list=".to_string()]
}

fn default_event_buffer() -> usize {
    1000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
