use std::time::Duration;

use crate::badge::Badge;
use crate::cache::ResponseCache;
use crate::render_gate::RenderGate;
use crate::scheduler::{PollPhase, PollScheduler};
use crate::snapshot::StatusSnapshot;
use crate::tracker::OptimisticTracker;
use crate::view_model::{placeholders, Notice, SyncViewModel};

/// Timing knobs of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub cache_ttl: Duration,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    /// Upper bound on the life of an unconfirmed optimistic item.
    pub fail_safe: Duration,
    /// Delay of the refresh that follows an optimistic add.
    pub quick_refresh: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(8),
            poll_interval: Duration::from_secs(10),
            retry_delay: Duration::from_secs(5),
            fail_safe: Duration::from_secs(30),
            quick_refresh: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    settings: SyncSettings,
    pub(crate) cache: ResponseCache,
    pub(crate) tracker: OptimisticTracker,
    pub(crate) scheduler: PollScheduler,
    pub(crate) gate: RenderGate,
    /// Last snapshot applied, cached or fresh.
    pub(crate) last_snapshot: Option<StatusSnapshot>,
    pub(crate) last_badge: Badge,
    pub(crate) active_in_flight: bool,
    pub(crate) active_count: Option<usize>,
    pub(crate) notice: Option<Notice>,
    pub(crate) loading: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::with_settings(SyncSettings::default())
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        Self {
            settings,
            cache: ResponseCache::new(settings.cache_ttl),
            tracker: OptimisticTracker::new(),
            scheduler: PollScheduler::new(settings.poll_interval, settings.retry_delay),
            gate: RenderGate::new(),
            last_snapshot: None,
            last_badge: Badge::default(),
            active_in_flight: false,
            active_count: None,
            notice: None,
            loading: false,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn tracker(&self) -> &OptimisticTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn gate(&self) -> &RenderGate {
        &self.gate
    }

    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn badge(&self) -> Badge {
        self.last_badge
    }

    pub fn view(&self) -> SyncViewModel {
        SyncViewModel {
            phase: self.scheduler.phase(),
            view_open: self.scheduler.view_open(),
            page_visible: self.scheduler.page_visible(),
            fetching: self.scheduler.phase() == PollPhase::Fetching
                || self.scheduler.in_flight().is_some(),
            loading: self.loading,
            badge: self.last_badge,
            active_downloads: self.active_count,
            known_jobs: self.last_snapshot.as_ref().map_or(0, StatusSnapshot::len),
            placeholders: placeholders(&self.tracker),
            notice: self.notice.clone(),
            cache_ttl: self.cache.ttl(),
            shown_digest: self.gate.last_digest(),
        }
    }
}
