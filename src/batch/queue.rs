//! Queue commands: enqueue, dequeue, clear, snapshot.

use crate::error::{QueueError, Result};
use crate::queue::QueueSnapshot;
use crate::types::{EnqueueOutcome, Event, JobReference, RunOutcome};
use crate::utils::short_source_label;
use std::collections::HashSet;
use tokio::task::JoinHandle;

use super::BatchDownloader;

impl BatchDownloader {
    /// Add a locator to the queue
    ///
    /// Collection locators are expanded into their entries. Single items get
    /// a best-effort title lookup first; the lookup never fails and falls
    /// back to [`UNKNOWN_TITLE`](crate::types::UNKNOWN_TITLE). Duplicates are
    /// checked before the lookup and again at insertion, since the queue may
    /// change while the lookup is in flight.
    ///
    /// Queue edits are allowed during a run; they only affect later runs.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Validation`] if the locator is empty or not a supported link
    /// - [`QueueError::Duplicate`] if the locator is already queued
    /// - [`Error::CollectionEmpty`](crate::Error::CollectionEmpty) and listing
    ///   errors for collections
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use redsea_dl::*;
    /// # async fn example(downloader: BatchDownloader) -> Result<()> {
    /// match downloader.enqueue("https://youtu.be/dQw4w9WgXcQ").await? {
    ///     EnqueueOutcome::Item { item } => println!("queued {}", item.display_title),
    ///     EnqueueOutcome::Collection { summary } => {
    ///         println!("queued {} from {}", summary.added.len(), summary.title)
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue(&self, source: &str) -> Result<EnqueueOutcome> {
        let (source, is_collection) = {
            let queue = self.queue.lock().await;
            let source = queue.rules().validate(source)?.to_string();
            let is_collection = queue.rules().is_collection(&source);
            if !is_collection && queue.contains(&source) {
                return Err(QueueError::Duplicate { locator: source }.into());
            }
            (source, is_collection)
        };

        if is_collection {
            let summary = self.expand_collection(&source).await?;
            return Ok(EnqueueOutcome::Collection { summary });
        }

        let title = self.backends.titles.resolve_title(&source).await;
        let item = JobReference::new(source, title);
        self.enqueue_item(item.clone()).await?;

        Ok(EnqueueOutcome::Item { item })
    }

    /// Enqueue in the background
    ///
    /// Returns immediately; the title lookup and insertion run on a spawned
    /// task. Failures are logged and also available through the handle.
    pub fn spawn_enqueue(&self, source: impl Into<String>) -> JoinHandle<Result<EnqueueOutcome>> {
        let downloader = self.clone();
        let source = source.into();
        tokio::spawn(async move {
            let result = downloader.enqueue(&source).await;
            if let Err(e) = &result {
                tracing::warn!(source = %source, error = %e, "Background enqueue failed");
            }
            result
        })
    }

    /// Append an item whose metadata is already known
    ///
    /// No lookup is performed. The item's locator is validated and checked
    /// for duplicates.
    pub async fn enqueue_item(&self, item: JobReference) -> Result<()> {
        let (item, len) = {
            let mut queue = self.queue.lock().await;
            let stored = queue.add(item)?.clone();
            (stored, queue.len())
        };

        if item.has_known_title() {
            tracing::info!(title = %item.display_title, queue_len = len, "Added to queue");
        } else {
            tracing::warn!(
                source = %short_source_label(&item.source),
                "Added to queue with unknown title"
            );
        }
        self.emit_event(Event::ItemQueued { item });
        self.emit_event(Event::QueueChanged { len });
        Ok(())
    }

    /// Remove and return the item at `index`
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::IndexOutOfRange`] if `index` is past the end.
    pub async fn dequeue(&self, index: usize) -> Result<JobReference> {
        let (removed, len) = {
            let mut queue = self.queue.lock().await;
            let removed = queue.remove_at(index)?;
            (removed, queue.len())
        };

        tracing::info!(title = %removed.display_title, "Removed from queue");
        self.emit_event(Event::QueueChanged { len });
        Ok(removed)
    }

    /// Remove every queued item
    ///
    /// Clearing an empty queue is a no-op and emits nothing.
    pub async fn clear_queue(&self) {
        let cleared = {
            let mut queue = self.queue.lock().await;
            let cleared = queue.len();
            queue.clear();
            cleared
        };

        if cleared > 0 {
            tracing::info!(cleared, "Queue cleared");
            self.emit_event(Event::QueueChanged { len: 0 });
        }
    }

    /// Ordered copy of the live queue
    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.lock().await.snapshot()
    }

    /// Number of queued items
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Drop the items a run completed from the live queue
    pub(crate) async fn remove_completed(&self, outcome: &RunOutcome) {
        let done: HashSet<String> = outcome
            .completed
            .iter()
            .map(|item| item.source.clone())
            .collect();
        if done.is_empty() {
            return;
        }

        let (removed, len) = {
            let mut queue = self.queue.lock().await;
            let removed = queue.remove_sources(&done);
            (removed, queue.len())
        };

        if removed > 0 {
            tracing::info!(removed, run_id = %outcome.run_id, "Removed completed items from queue");
            self.emit_event(Event::QueueChanged { len });
        }
    }
}
