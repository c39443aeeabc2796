use std::time::Duration;

use crate::badge::Badge;
use crate::snapshot::JobId;
use crate::time::{RequestId, TimerId};
use crate::view_model::{FallbackView, Notice, Placeholder, RenderedSections};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    // Network, executed by the engine.
    FetchStatus { request: RequestId },
    FetchActiveDownloads,
    SubmitDownload { id: JobId },
    CancelDownload { id: JobId },
    ClearCompleted,

    // Timers, owned by the runtime.
    StartTimer { timer: TimerId, after: Duration },
    CancelTimer { timer: TimerId },

    // One-way notifications to the view layer.
    SnapshotChanged(RenderedSections),
    FallbackShown(FallbackView),
    PlaceholdersChanged(Vec<Placeholder>),
    BadgeChanged(Badge),
    ActiveCountChanged(usize),
    LoadingChanged(bool),
    NoticeShown(Notice),
    NoticeCleared,
}
