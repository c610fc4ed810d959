//! Parser for yt-dlp console output

use super::traits::FetchProgress;
use regex::Regex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Prefix of the progress lines requested through `--progress-template`
pub(crate) const PROGRESS_PREFIX: &str = "[redsea]";

/// `--progress-template` value understood by [`parse_line`]
pub(crate) const PROGRESS_TEMPLATE: &str =
    "download:[redsea] %(progress._percent_str)s %(progress.eta)s";

static DEFAULT_PROGRESS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%(?:.*?ETA\s+(\d+(?::\d+){0,2}))?").ok()
});

static DESTINATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^\[(?:download|ExtractAudio)\] Destination: (.+)$"#).ok()
});

static MERGED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^\[Merger\] Merging formats into "(.+)"$"#).ok());

static ALREADY_DOWNLOADED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\[download\] (.+) has already been downloaded").ok());

/// One classified line of engine output
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    /// Download progress
    Progress(FetchProgress),
    /// A file the engine is writing or has written
    Destination(PathBuf),
    /// An `ERROR:` line, with the prefix removed
    Error(String),
    /// Anything else
    Other,
}

/// Classify a single line of yt-dlp output
pub(crate) fn parse_line(line: &str) -> OutputLine {
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_template_progress(rest)
            .map(OutputLine::Progress)
            .unwrap_or(OutputLine::Other);
    }

    if let Some(message) = line.strip_prefix("ERROR:") {
        return OutputLine::Error(message.trim().to_string());
    }

    for pattern in [&DESTINATION, &MERGED, &ALREADY_DOWNLOADED] {
        if let Some(re) = pattern.as_ref()
            && let Some(caps) = re.captures(line)
        {
            return OutputLine::Destination(PathBuf::from(&caps[1]));
        }
    }

    if let Some(re) = DEFAULT_PROGRESS.as_ref()
        && let Some(caps) = re.captures(line)
        && let Ok(percent) = caps[1].parse::<f32>()
    {
        return OutputLine::Progress(FetchProgress {
            percent: percent.clamp(0.0, 100.0),
            eta_secs: caps.get(2).and_then(|m| parse_clock(m.as_str())),
        });
    }

    OutputLine::Other
}

/// Parse `" 42.3% 17"` as produced by [`PROGRESS_TEMPLATE`]
///
/// The percent field may carry ANSI color codes and padding; the ETA is an
/// integer number of seconds or `NA`.
fn parse_template_progress(rest: &str) -> Option<FetchProgress> {
    let cleaned = strip_ansi(rest);
    let mut fields = cleaned.split_whitespace();

    let percent = fields
        .next()?
        .trim_end_matches('%')
        .parse::<f32>()
        .ok()?
        .clamp(0.0, 100.0);
    let eta_secs = fields
        .next()
        .and_then(|eta| eta.parse::<f64>().ok())
        .filter(|eta| eta.is_finite() && *eta >= 0.0)
        .map(|eta| eta as u64);

    Some(FetchProgress { percent, eta_secs })
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds
fn parse_clock(clock: &str) -> Option<u64> {
    clock
        .split(':')
        .try_fold(0u64, |acc, part| {
            acc.checked_mul(60)?.checked_add(part.parse::<u64>().ok()?)
        })
}

fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // skip until the final byte of the escape sequence
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Pick the most useful error message from collected stderr lines
///
/// Prefers the last `ERROR:` line, then the last non-empty line.
pub(crate) fn summarize_failure(errors: &[String], tail: &VecDeque<String>) -> Option<String> {
    errors
        .last()
        .cloned()
        .or_else(|| tail.iter().rev().find(|l| !l.trim().is_empty()).cloned())
}
