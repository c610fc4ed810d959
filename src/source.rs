//! Coarse locator checks
//!
//! These checks only look at the shape of a locator: non-empty, parseable as a
//! URL (a missing scheme is tolerated), and hosted on an allowed domain. Site
//! specific URL grammars are left to the fetch engine.

use crate::config::SourceConfig;
use crate::error::QueueError;
use url::Url;

/// Locator rules derived from [`SourceConfig`]
#[derive(Clone, Debug)]
pub struct SourceRules {
    allowed_domains: Vec<String>,
    collection_markers: Vec<String>,
}

impl Default for SourceRules {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl SourceRules {
    /// Build rules from configuration
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            collection_markers: config.collection_markers.clone(),
        }
    }

    /// Check that a locator may enter the queue
    ///
    /// Returns the trimmed locator on success.
    pub fn validate<'a>(&self, source: &'a str) -> Result<&'a str, QueueError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(invalid(source, "source is empty"));
        }

        let url = parse_lenient(trimmed).ok_or_else(|| invalid(trimmed, "not a URL"))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(trimmed, "URL has no host"))?
            .to_ascii_lowercase();

        if !self.host_allowed(&host) {
            return Err(invalid(
                trimmed,
                &format!("host {host} is not a supported media site"),
            ));
        }

        Ok(trimmed)
    }

    /// Whether the locator carries a collection marker
    pub fn is_collection(&self, source: &str) -> bool {
        self.collection_markers
            .iter()
            .any(|marker| source.contains(marker.as_str()))
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Canonical locator for a single item of a collection
pub fn canonical_item_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Extract the item id from a watch or short link
pub fn item_id(source: &str) -> Option<String> {
    let url = parse_lenient(source.trim())?;
    let host = url.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

fn parse_lenient(source: &str) -> Option<Url> {
    match Url::parse(source) {
        Ok(url) if url.has_host() => Some(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{source}")).ok()
        }
        Err(_) => None,
    }
}

fn invalid(source: &str, reason: &str) -> QueueError {
    QueueError::Validation {
        locator: source.to_string(),
        reason: reason.to_string(),
    }
}
