//! Ordered, duplicate-free queue of pending jobs.

use crate::error::QueueError;
use crate::source::SourceRules;
use crate::types::JobReference;
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable ordered copy of the queue, taken when a run starts
///
/// Cloning is cheap; later edits to the live queue never affect a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    items: Arc<[JobReference]>,
}

impl QueueSnapshot {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<&JobReference> {
        self.items.get(index)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, JobReference> {
        self.items.iter()
    }

    /// Locators of every item
    pub fn sources(&self) -> HashSet<String> {
        self.items.iter().map(|item| item.source.clone()).collect()
    }
}

impl From<Vec<JobReference>> for QueueSnapshot {
    fn from(items: Vec<JobReference>) -> Self {
        Self {
            items: items.into(),
        }
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a JobReference;
    type IntoIter = std::slice::Iter<'a, JobReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// The live queue
///
/// Insertion order is preserved and no two items share a `source`.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    items: Vec<JobReference>,
    sources: HashSet<String>,
    rules: SourceRules,
}

impl DownloadQueue {
    /// Create an empty queue that validates locators with `rules`
    pub fn new(rules: SourceRules) -> Self {
        Self {
            items: Vec::new(),
            sources: HashSet::new(),
            rules,
        }
    }

    /// Append an item, returning the stored (trimmed) copy
    ///
    /// # Errors
    ///
    /// - [`QueueError::Validation`] if the locator is empty or fails the shape check
    /// - [`QueueError::Duplicate`] if the locator is already queued
    pub fn add(&mut self, mut item: JobReference) -> Result<&JobReference, QueueError> {
        let source = self.rules.validate(&item.source)?.to_string();
        if self.sources.contains(&source) {
            return Err(QueueError::Duplicate { locator: source });
        }
        item.source = source.clone();
        self.sources.insert(source);
        self.items.push(item);
        Ok(&self.items[self.items.len() - 1])
    }

    /// Remove and return the item at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<JobReference, QueueError> {
        if index >= self.items.len() {
            return Err(QueueError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        self.sources.remove(&removed.source);
        Ok(removed)
    }

    /// Remove every item whose locator is in `sources`, returning how many were removed
    pub fn remove_sources(&mut self, sources: &HashSet<String>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !sources.contains(&item.source));
        self.sources.retain(|source| !sources.contains(source));
        before - self.items.len()
    }

    /// Empty the queue
    pub fn clear(&mut self) {
        self.items.clear();
        self.sources.clear();
    }

    /// Immutable ordered copy for a run
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::from(self.items.clone())
    }

    /// Whether `source` is queued (compared after trimming)
    pub fn contains(&self, source: &str) -> bool {
        self.sources.contains(source.trim())
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Locator rules used by this queue
    pub fn rules(&self) -> &SourceRules {
        &self.rules
    }
}
