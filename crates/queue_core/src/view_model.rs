use std::time::Duration;

use crate::badge::Badge;
use crate::scheduler::PollPhase;
use crate::snapshot::{JobId, JobState, SnapshotDigest, StatusSnapshot};
use crate::tracker::OptimisticTracker;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub id: JobId,
    pub title: String,
    pub state: JobState,
    /// Rounded percent, downloading rows only.
    pub progress_percent: Option<u8>,
    pub cancellable: bool,
    /// The server kept a local copy the user can fetch.
    pub downloadable: bool,
    /// Error-bucket row the user cancelled rather than a failure.
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub state: JobState,
    pub rows: Vec<JobRowView>,
}

impl SectionView {
    pub fn heading(&self) -> &'static str {
        match self.state {
            JobState::Queued => "Queued",
            JobState::Downloading => "Downloading",
            JobState::Completed => "Completed",
            JobState::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub id: JobId,
    pub title: String,
}

/// What the status panel shows for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedSections {
    pub sections: Vec<SectionView>,
    /// Optimistic items still waiting for confirmation, shown as queued.
    pub placeholders: Vec<Placeholder>,
}

impl RenderedSections {
    pub fn build(snapshot: &StatusSnapshot, tracker: &OptimisticTracker) -> Self {
        let sections = JobState::ALL
            .into_iter()
            .filter_map(|state| {
                let bucket = snapshot.bucket(state);
                if bucket.is_empty() {
                    return None;
                }
                let rows = bucket
                    .values()
                    .map(|job| JobRowView {
                        id: job.id.clone(),
                        title: display_title(&job.title),
                        state,
                        progress_percent: match state {
                            JobState::Downloading => job.progress.map(|p| p.round() as u8),
                            _ => None,
                        },
                        cancellable: state.is_active(),
                        downloadable: job.download_path.is_some(),
                        cancelled: job.cancelled,
                    })
                    .collect();
                Some(SectionView { state, rows })
            })
            .collect();

        Self {
            sections,
            placeholders: placeholders(tracker),
        }
    }

    /// Nothing real and nothing pending: the panel shows "No downloads."
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.placeholders.is_empty()
    }
}

pub fn placeholders(tracker: &OptimisticTracker) -> Vec<Placeholder> {
    tracker
        .items()
        .into_iter()
        .map(|item| Placeholder {
            id: item.id.clone(),
            title: display_title(&item.title),
        })
        .collect()
}

fn display_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Shown when no usable snapshot is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackView {
    Placeholders(Vec<Placeholder>),
    Empty { offer_retry: bool },
}

impl FallbackView {
    pub fn from_tracker(tracker: &OptimisticTracker) -> Self {
        if tracker.is_empty() {
            FallbackView::Empty { offer_retry: true }
        } else {
            FallbackView::Placeholders(placeholders(tracker))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Non-blocking hint, the panel keeps showing cached data.
    Subtle,
    /// Error state with a retry action.
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub offers_retry: bool,
}

impl Notice {
    pub fn stale_cache() -> Self {
        Self {
            level: NoticeLevel::Subtle,
            message: "Using cached data. Refresh failed.".to_string(),
            offers_retry: false,
        }
    }

    pub fn load_failed() -> Self {
        Self {
            level: NoticeLevel::Blocking,
            message: "Error loading status. Please try again.".to_string(),
            offers_retry: true,
        }
    }

    /// A cancel or clear the server refused.
    pub fn action_failed(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Subtle,
            message: message.into(),
            offers_retry: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncViewModel {
    pub phase: PollPhase,
    pub view_open: bool,
    pub page_visible: bool,
    pub fetching: bool,
    pub loading: bool,
    pub badge: Badge,
    pub active_downloads: Option<usize>,
    pub known_jobs: usize,
    pub placeholders: Vec<Placeholder>,
    pub notice: Option<Notice>,
    pub cache_ttl: Duration,
    /// Digest of the snapshot the panel currently shows.
    pub shown_digest: Option<SnapshotDigest>,
}
