//! Collection (playlist) expansion into the queue.

use crate::error::{Error, QueueError, Result};
use crate::metadata::CollectionEntry;
use crate::source::canonical_item_url;
use crate::types::{CollectionSummary, Event, JobReference, UNKNOWN_TITLE};
use crate::utils::format_duration;
use std::collections::HashSet;

use super::BatchDownloader;

/// Lazy walk over a collection listing
///
/// Yields one [`JobReference`] per accessible entry, skipping unavailable
/// entries and locators already known at expansion time (including repeats
/// within the collection itself).
pub(crate) struct Expansion<'a, I> {
    entries: I,
    known: &'a HashSet<String>,
    seen: HashSet<String>,
    accessible: usize,
    skipped_duplicates: usize,
    skipped_unavailable: usize,
}

impl<'a, I> Expansion<'a, I>
where
    I: Iterator<Item = Option<CollectionEntry>>,
{
    pub(crate) fn new(entries: I, known: &'a HashSet<String>) -> Self {
        Self {
            entries,
            known,
            seen: HashSet::new(),
            accessible: 0,
            skipped_duplicates: 0,
            skipped_unavailable: 0,
        }
    }
}

impl<I> Iterator for Expansion<'_, I>
where
    I: Iterator<Item = Option<CollectionEntry>>,
{
    type Item = JobReference;

    fn next(&mut self) -> Option<JobReference> {
        loop {
            let Some(entry) = self.entries.next()? else {
                self.skipped_unavailable += 1;
                continue;
            };
            self.accessible += 1;

            let source = canonical_item_url(&entry.id);
            if self.known.contains(&source) || !self.seen.insert(source.clone()) {
                self.skipped_duplicates += 1;
                continue;
            }

            let title = entry.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            return Some(
                JobReference::new(source, title).with_duration(entry.duration.unwrap_or(0)),
            );
        }
    }
}

impl BatchDownloader {
    /// List a collection and append its entries to the queue
    ///
    /// Entries keep their listing order. Unavailable entries and entries
    /// already queued are skipped and counted. Nothing is added when the
    /// collection has no accessible entries.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Validation`] if the locator fails the shape check
    /// - [`Error::CollectionEmpty`] if no entry is accessible
    /// - [`Error::ExternalTool`] if the listing tool fails
    pub async fn expand_collection(&self, source: &str) -> Result<CollectionSummary> {
        let source = {
            let queue = self.queue.lock().await;
            queue.rules().validate(source)?.to_string()
        };

        tracing::info!(source = %source, "Fetching collection");
        let listing = self.backends.collections.list(&source).await?;
        let title = listing.display_title().to_string();

        let known = self.queue_snapshot().await.sources();
        let mut expansion = Expansion::new(listing.entries.into_iter(), &known);
        let candidates: Vec<JobReference> = expansion.by_ref().collect();

        if expansion.accessible == 0 {
            tracing::warn!(
                source = %source,
                unavailable = expansion.skipped_unavailable,
                "Collection has no accessible entries"
            );
            return Err(Error::CollectionEmpty {
                locator: source,
                unavailable: expansion.skipped_unavailable,
            });
        }

        let mut skipped_duplicates = expansion.skipped_duplicates;
        let mut skipped_unavailable = expansion.skipped_unavailable;
        let mut added = Vec::with_capacity(candidates.len());
        let len = {
            let mut queue = self.queue.lock().await;
            for item in candidates {
                match queue.add(item) {
                    Ok(stored) => {
                        tracing::debug!(
                            title = %stored.display_title,
                            duration = %format_duration(stored.estimated_duration),
                            "Queued collection entry"
                        );
                        added.push(stored.clone());
                    }
                    // queued by someone else since the snapshot
                    Err(QueueError::Duplicate { .. }) => skipped_duplicates += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping collection entry");
                        skipped_unavailable += 1;
                    }
                }
            }
            queue.len()
        };

        tracing::info!(
            title = %title,
            added = added.len(),
            skipped_duplicates,
            skipped_unavailable,
            "Collection expanded"
        );

        let summary = CollectionSummary {
            source,
            title,
            added,
            skipped_duplicates,
            skipped_unavailable,
        };

        self.emit_event(Event::CollectionExpanded {
            title: summary.title.clone(),
            added: summary.added.len(),
            skipped_duplicates,
            skipped_unavailable,
        });
        if !summary.added.is_empty() {
            self.emit_event(Event::QueueChanged { len });
        }

        Ok(summary)
    }
}
