//! Page-title lookup for single items

use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::types::UNKNOWN_TITLE;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static TITLE_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.+?)</title>").ok());

static OG_TITLE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+property="og:title"\s+content="([^"]+)""#).ok()
});

/// Suffixes the site appends to page titles, longest first
const SITE_SUFFIXES: &[&str] = &[" - YouTube Music", " - YouTube"];

/// Resolves a display title for a locator
///
/// Implementations never fail: any error, timeout or empty result yields
/// [`UNKNOWN_TITLE`].
#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// Look up the display title of `source`
    async fn resolve_title(&self, source: &str) -> String;
}

/// Title resolver that scrapes the item's HTML page
pub struct HttpTitleResolver {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTitleResolver {
    /// Create a resolver using the lookup timeout and User-Agent from `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.title_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.title_timeout,
        })
    }

    async fn fetch_title(&self, source: &str) -> Result<Option<String>> {
        let url = if source.contains("://") {
            source.to_string()
        } else {
            format!("https://{source}")
        };

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(extract_title(&body))
    }
}

#[async_trait]
impl TitleResolver for HttpTitleResolver {
    async fn resolve_title(&self, source: &str) -> String {
        match tokio::time::timeout(self.timeout, self.fetch_title(source)).await {
            Ok(Ok(Some(title))) => title,
            Ok(Ok(None)) => {
                tracing::debug!(source, "No title found in page");
                UNKNOWN_TITLE.to_string()
            }
            Ok(Err(e)) => {
                tracing::debug!(source, error = %e, "Title lookup failed");
                UNKNOWN_TITLE.to_string()
            }
            Err(_) => {
                tracing::debug!(source, timeout_secs = self.timeout.as_secs(), "Title lookup timed out");
                UNKNOWN_TITLE.to_string()
            }
        }
    }
}

/// Extract a display title from an HTML page
///
/// Reads `<title>` first and falls back to the `og:title` meta tag. The
/// site name suffix is removed and basic HTML entities are decoded.
pub fn extract_title(html: &str) -> Option<String> {
    let from_tag = TITLE_TAG
        .as_ref()
        .and_then(|re| re.captures(html))
        .map(|caps| clean_title(&caps[1]))
        .filter(|t| !t.is_empty());

    from_tag.or_else(|| {
        OG_TITLE
            .as_ref()
            .and_then(|re| re.captures(html))
            .map(|caps| clean_title(&caps[1]))
            .filter(|t| !t.is_empty())
    })
}

fn clean_title(raw: &str) -> String {
    let decoded = decode_entities(raw.trim());
    let mut title = decoded.trim();
    for suffix in SITE_SUFFIXES {
        if let Some(stripped) = title.strip_suffix(suffix) {
            title = stripped;
            break;
        }
    }
    let title = title.trim();
    // a bare site name is not a title
    if title.eq_ignore_ascii_case("youtube") {
        return String::new();
    }
    title.to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
