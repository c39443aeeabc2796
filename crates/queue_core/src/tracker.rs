use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::{JobId, StatusSnapshot};
use crate::time::{TimerId, Timestamp};

/// A download the user just asked for, before the server knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub id: JobId,
    pub title: String,
}

impl PendingJob {
    pub fn new(id: impl Into<JobId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticItem {
    pub id: JobId,
    pub title: String,
    pub inserted_at: Timestamp,
    pub fail_safe: TimerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// Timer the runtime must arm for the new item.
    pub fail_safe: TimerId,
    /// Item previously tracked under the same id; its timer must be cancelled.
    pub replaced: Option<OptimisticItem>,
}

/// Placeholders for user actions the server has not confirmed yet.
///
/// An item lives until a snapshot carries its id (any bucket) or its
/// fail-safe timer fires, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimisticTracker {
    items: BTreeMap<JobId, OptimisticItem>,
    next_generation: u64,
}

impl OptimisticTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job: PendingJob, now: Timestamp) -> Added {
        self.next_generation += 1;
        let fail_safe = TimerId::FailSafe(self.next_generation);
        let replaced = self.items.insert(
            job.id.clone(),
            OptimisticItem {
                id: job.id,
                title: job.title,
                inserted_at: now,
                fail_safe,
            },
        );
        Added {
            fail_safe,
            replaced,
        }
    }

    /// Idempotent; the caller cancels the returned item's timer.
    pub fn remove(&mut self, id: &JobId) -> Option<OptimisticItem> {
        self.items.remove(id)
    }

    /// Removes the item owning `timer`. A stale generation (item removed and
    /// re-added since) matches nothing.
    pub fn expire(&mut self, timer: TimerId) -> Option<OptimisticItem> {
        let id = self
            .items
            .values()
            .find(|item| item.fail_safe == timer)
            .map(|item| item.id.clone())?;
        self.items.remove(&id)
    }

    /// Removes every tracked id the snapshot confirms, in any bucket.
    pub fn reconcile(&mut self, snapshot: &StatusSnapshot) -> Vec<OptimisticItem> {
        let confirmed: Vec<JobId> = self.ids().intersection(&snapshot.ids()).cloned().collect();
        confirmed
            .iter()
            .filter_map(|id| self.items.remove(id))
            .collect()
    }

    pub fn has(&self, id: &JobId) -> bool {
        self.items.contains_key(id)
    }

    pub fn ids(&self) -> BTreeSet<JobId> {
        self.items.keys().cloned().collect()
    }

    /// Newest first, the order placeholders are shown in.
    pub fn items(&self) -> Vec<&OptimisticItem> {
        let mut items: Vec<_> = self.items.values().collect();
        items.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at).then(a.id.cmp(&b.id)));
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
