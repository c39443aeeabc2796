use serde_json::Value;

use crate::snapshot::JobId;
use crate::time::{RequestId, TimerId, Timestamp};
use crate::tracker::PendingJob;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Status panel opened.
    ViewOpened { now: Timestamp },
    /// Status panel closed.
    ViewClosed,
    /// Host page gained or lost visibility.
    PageVisibilityChanged { visible: bool, now: Timestamp },
    /// User pressed refresh; bypasses the cache.
    ManualRefresh { now: Timestamp },
    /// A timer armed through `Effect::StartTimer` elapsed.
    TimerFired { timer: TimerId, now: Timestamp },
    /// Response to `Effect::FetchStatus`, raw JSON or a failure description.
    StatusFetched {
        request: RequestId,
        result: Result<Value, String>,
        now: Timestamp,
    },
    /// Response to `Effect::FetchActiveDownloads`.
    ActiveDownloadsFetched {
        result: Result<Value, String>,
        now: Timestamp,
    },
    /// User clicked download; the engine submits the job.
    DownloadRequested { job: PendingJob, now: Timestamp },
    /// The UI submitted the job itself and only reports the optimistic start.
    OptimisticStarted { job: PendingJob, now: Timestamp },
    /// The UI's own submission failed.
    OptimisticFailed { id: JobId },
    /// Response to `Effect::SubmitDownload`.
    SubmitFinished {
        id: JobId,
        result: Result<(), String>,
        now: Timestamp,
    },
    CancelRequested { id: JobId },
    CancelFinished {
        id: JobId,
        result: Result<(), String>,
        now: Timestamp,
    },
    ClearCompletedRequested,
    ClearCompletedFinished {
        result: Result<(), String>,
        now: Timestamp,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
