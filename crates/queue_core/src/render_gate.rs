use crate::badge::Badge;
use crate::snapshot::{SnapshotDigest, StatusSnapshot};
use crate::tracker::{OptimisticItem, OptimisticTracker};

/// Outcome of committing a snapshot against the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Optimistic items the snapshot confirmed.
    pub confirmed: Vec<OptimisticItem>,
    /// Badge derived after reconciliation.
    pub badge: Badge,
}

/// Suppresses redundant renders of identical snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderGate {
    last: Option<SnapshotDigest>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `snapshot` differs from the last one let through. The new
    /// digest is recorded, so an identical follow-up returns false.
    pub fn should_render(&mut self, snapshot: &StatusSnapshot) -> bool {
        let digest = snapshot.digest();
        if self.last == Some(digest) {
            return false;
        }
        self.last = Some(digest);
        true
    }

    /// The panel no longer shows the recorded snapshot.
    pub fn forget(&mut self) {
        self.last = None;
    }

    pub fn last_digest(&self) -> Option<SnapshotDigest> {
        self.last
    }

    /// Reconciles the tracker with `snapshot`, then derives the badge from
    /// what is left.
    pub fn commit(snapshot: &StatusSnapshot, tracker: &mut OptimisticTracker) -> Committed {
        let confirmed = tracker.reconcile(snapshot);
        let badge = Badge::derive(Some(snapshot), &tracker.ids());
        Committed { confirmed, badge }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::snapshot::{Job, JobState};
    use crate::tracker::PendingJob;

    #[test]
    fn identical_snapshots_render_once() {
        let mut gate = RenderGate::new();
        let snapshot = StatusSnapshot::from_jobs([Job::new("b1", "Dune", JobState::Queued)]);

        assert!(gate.should_render(&snapshot));
        assert!(!gate.should_render(&snapshot.clone()));

        gate.forget();
        assert!(gate.should_render(&snapshot));
    }

    #[test]
    fn changed_snapshot_renders_again() {
        let mut gate = RenderGate::new();
        let first = StatusSnapshot::from_jobs([Job::new("b1", "Dune", JobState::Queued)]);
        let second = StatusSnapshot::from_jobs([Job::new("b1", "Dune", JobState::Downloading)]);

        assert!(gate.should_render(&first));
        assert!(gate.should_render(&second));
        assert!(gate.should_render(&first));
    }

    #[test]
    fn commit_reconciles_before_counting() {
        let mut tracker = OptimisticTracker::new();
        tracker.add(PendingJob::new("b1", "Dune"), Duration::ZERO);
        tracker.add(PendingJob::new("b2", "Emma"), Duration::ZERO);
        let snapshot =
            StatusSnapshot::from_jobs([Job::new("b1", "Dune", JobState::Downloading)]);

        let committed = RenderGate::commit(&snapshot, &mut tracker);

        assert_eq!(committed.confirmed.len(), 1);
        assert_eq!(committed.confirmed[0].id.as_str(), "b1");
        assert_eq!(committed.badge.count, 2);
        assert!(!tracker.has(&"b1".into()));
    }
}
