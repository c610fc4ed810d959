//! Display helpers for titles, locators and durations

/// Longest title shown before truncation
const MAX_TITLE_CHARS: usize = 50;

/// Format a duration in seconds as `m:ss`
///
/// Zero means unknown and formats as an empty string.
///
/// # Examples
///
/// ```
/// use redsea_dl::utils::format_duration;
///
/// assert_eq!(format_duration(215), "3:35");
/// assert_eq!(format_duration(3725), "62:05");
/// assert_eq!(format_duration(0), "");
/// ```
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Short label for a locator
///
/// Links with a recognizable item id become `youtu.be/<id>`. Anything else is
/// cut to its first 20 characters followed by `...`.
///
/// # Examples
///
/// ```
/// use redsea_dl::utils::short_source_label;
///
/// assert_eq!(
///     short_source_label("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
///     "youtu.be/dQw4w9WgXcQ"
/// );
/// assert_eq!(
///     short_source_label("https://www.youtube.com/playlist?list=PL123"),
///     "https://www.youtube...."
/// );
/// ```
#[must_use]
pub fn short_source_label(source: &str) -> String {
    if let Some(id) = crate::source::item_id(source) {
        return format!("youtu.be/{id}");
    }

    let source = source.trim();
    if source.chars().count() <= 20 {
        return source.to_string();
    }
    let head: String = source.chars().take(20).collect();
    format!("{head}...")
}

/// Shorten a title for one-line display
///
/// Titles longer than 50 characters keep their first 47 and end in `...`.
#[must_use]
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{head}...")
}
