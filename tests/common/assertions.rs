//! Event waiting and file assertions for integration tests

use redsea_dl::{BatchDownloader, Event, RunOutcome};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

/// Collect events from `events` until `stop_predicate` matches or the timeout hits
///
/// The matching event is included.
pub async fn collect_events_until<F>(
    events: &mut Receiver<Event>,
    timeout: Duration,
    stop_predicate: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let should_stop = stop_predicate(&event);
            collected.push(event);
            if should_stop {
                break;
            }
        }
    })
    .await;

    collected
}

/// Wait for the next `RunFinished` on `events`
pub async fn wait_for_run_finished(
    events: &mut Receiver<Event>,
    timeout: Duration,
) -> Option<RunOutcome> {
    let collected =
        collect_events_until(events, timeout, |e| matches!(e, Event::RunFinished { .. })).await;
    match collected.into_iter().last() {
        Some(Event::RunFinished { outcome }) => Some(outcome),
        _ => None,
    }
}

/// Wait for an event matching `predicate` on a fresh subscription
pub async fn wait_for_event<F>(
    downloader: &BatchDownloader,
    timeout: Duration,
    predicate: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut events = downloader.subscribe();

    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await;

    result.ok().flatten()
}

/// Assert that all expected files exist in a directory
pub fn assert_files_exist(dir: &Path, expected_files: &[&str]) {
    for file in expected_files {
        let path = dir.join(file);
        assert!(path.exists(), "Expected file not found: {}", path.display());
    }
}

/// Assert that none of the given files exist in a directory
pub fn assert_files_absent(dir: &Path, unexpected_files: &[&str]) {
    for file in unexpected_files {
        let path = dir.join(file);
        assert!(!path.exists(), "Unexpected file found: {}", path.display());
    }
}
