//! Collection (playlist) listing

use crate::config::{MetadataConfig, ToolsConfig};
use crate::engine::locate_ytdlp;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Title used when a collection reports none
pub const UNKNOWN_COLLECTION: &str = "Unknown Playlist";

/// One accessible entry of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Item id, turned into a canonical locator on expansion
    pub id: String,
    /// Item title, if listed
    pub title: Option<String>,
    /// Duration in seconds, if listed
    pub duration: Option<u64>,
}

/// Entries of a collection, in listing order
///
/// `None` marks an entry the resolver could not access (private, deleted,
/// region locked); expansion skips and counts these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionListing {
    /// Collection title, if listed
    pub title: Option<String>,
    /// Entries; `None` for inaccessible ones
    pub entries: Vec<Option<CollectionEntry>>,
}

impl CollectionListing {
    /// Collection title or [`UNKNOWN_COLLECTION`]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_COLLECTION)
    }
}

/// Lists the entries of a collection locator
#[async_trait]
pub trait CollectionResolver: Send + Sync {
    /// List `source`
    ///
    /// # Errors
    ///
    /// - [`Error::CollectionEmpty`] when the listing has no entries at all
    /// - [`Error::ExternalTool`] when the listing tool fails
    async fn list(&self, source: &str) -> Result<CollectionListing>;
}

/// Collection resolver using `yt-dlp --flat-playlist -J`
#[derive(Debug, Clone)]
pub struct YtDlpCollectionResolver {
    binary_path: PathBuf,
    user_agent: Option<String>,
}

impl YtDlpCollectionResolver {
    /// Create a resolver with an explicit yt-dlp path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            user_agent: None,
        }
    }

    /// Build from tool and metadata settings; `None` when yt-dlp cannot be located
    pub fn from_config(tools: &ToolsConfig, metadata: &MetadataConfig) -> Option<Self> {
        locate_ytdlp(tools).map(|path| Self {
            binary_path: path,
            user_agent: Some(metadata.user_agent.clone()),
        })
    }
}

#[async_trait]
impl CollectionResolver for YtDlpCollectionResolver {
    async fn list(&self, source: &str) -> Result<CollectionListing> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(["--flat-playlist", "-J", "--no-warnings"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(user_agent) = &self.user_agent {
            command.arg("--user-agent").arg(user_agent);
        }
        let output = command
            .arg("--")
            .arg(source)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find_map(|line| line.strip_prefix("ERROR:"))
                .map(str::trim)
                .unwrap_or("yt-dlp could not list the collection");
            return Err(Error::ExternalTool(message.to_string()));
        }

        parse_listing(source, &output.stdout)
    }
}

#[derive(Deserialize)]
struct RawListing {
    title: Option<String>,
    entries: Option<Vec<Option<RawEntry>>>,
}

#[derive(Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
}

/// Parse the JSON printed by `yt-dlp --flat-playlist -J`
pub(crate) fn parse_listing(source: &str, json: &[u8]) -> Result<CollectionListing> {
    let raw: RawListing = serde_json::from_slice(json)?;

    let entries = match raw.entries {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            return Err(Error::CollectionEmpty {
                locator: source.to_string(),
                unavailable: 0,
            });
        }
    };

    let entries = entries
        .into_iter()
        .map(|entry| {
            let entry = entry?;
            if entry.title.as_deref().is_some_and(is_placeholder_title) {
                return None;
            }
            let id = entry.id.filter(|id| !id.is_empty())?;
            Some(CollectionEntry {
                id,
                title: entry.title.filter(|t| !t.is_empty()),
                duration: entry
                    .duration
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .map(|d| d as u64),
            })
        })
        .collect();

    Ok(CollectionListing {
        title: raw.title.filter(|t| !t.is_empty()),
        entries,
    })
}

/// Titles yt-dlp reports for entries that cannot be played
fn is_placeholder_title(title: &str) -> bool {
    matches!(title, "[Private video]" | "[Deleted video]")
}
