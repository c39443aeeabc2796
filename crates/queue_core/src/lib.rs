//! Queue core: pure reconciliation state machine for the download status panel.
mod badge;
mod cache;
mod effect;
mod msg;
mod render_gate;
mod scheduler;
mod snapshot;
mod state;
mod time;
mod tracker;
mod update;
mod view_model;

pub use badge::{compute as compute_active_count, Badge, BadgeTone};
pub use cache::{CacheEntry, CachedPayload, ResourceKey, ResponseCache};
pub use effect::Effect;
pub use msg::Msg;
pub use render_gate::{Committed, RenderGate};
pub use scheduler::{FetchOutcome, FetchTrigger, InFlight, PollPhase, PollScheduler};
pub use snapshot::{
    ActiveDownloads, Job, JobId, JobState, SnapshotDigest, SnapshotError, StatusSnapshot,
};
pub use state::{SyncSettings, SyncState};
pub use time::{RequestId, TimerId, Timestamp};
pub use tracker::{Added, OptimisticItem, OptimisticTracker, PendingJob};
pub use update::update;
pub use view_model::{
    FallbackView, JobRowView, Notice, NoticeLevel, Placeholder, RenderedSections, SectionView,
    SyncViewModel, UNTITLED,
};
