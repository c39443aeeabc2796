use std::time::Instant;

use queue_core::{Effect, JobId, Msg, RequestId, Timestamp};
use queue_engine::{EngineEvent, EngineHandle};
use queue_logging::{queue_debug, queue_info};

use super::timers::TimerQueue;
use super::view::ViewSink;

/// The network side of effect execution.
pub trait Backend {
    fn fetch_status(&self, request: u64);
    fn fetch_active_downloads(&self);
    fn submit(&self, id: String);
    fn cancel(&self, id: String);
    fn clear_completed(&self);
}

impl Backend for EngineHandle {
    fn fetch_status(&self, request: u64) {
        EngineHandle::fetch_status(self, request);
    }

    fn fetch_active_downloads(&self) {
        EngineHandle::fetch_active_downloads(self);
    }

    fn submit(&self, id: String) {
        EngineHandle::submit(self, id);
    }

    fn cancel(&self, id: String) {
        EngineHandle::cancel(self, id);
    }

    fn clear_completed(&self) {
        EngineHandle::clear_completed(self);
    }
}

/// Executes core effects: network calls go to the backend, timers into the
/// queue, everything else to the view.
pub struct EffectRunner<B, V> {
    backend: B,
    view: V,
    timers: TimerQueue,
}

impl<B: Backend, V: ViewSink> EffectRunner<B, V> {
    pub fn new(backend: B, view: V) -> Self {
        Self {
            backend,
            view,
            timers: TimerQueue::new(),
        }
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn run(&mut self, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::FetchStatus { request } => self.backend.fetch_status(request.0),
                Effect::FetchActiveDownloads => self.backend.fetch_active_downloads(),
                Effect::SubmitDownload { id } => {
                    queue_info!("Submitting download {}", id);
                    self.backend.submit(id.as_str().to_string());
                }
                Effect::CancelDownload { id } => {
                    queue_info!("Cancelling download {}", id);
                    self.backend.cancel(id.as_str().to_string());
                }
                Effect::ClearCompleted => self.backend.clear_completed(),
                Effect::StartTimer { timer, after } => {
                    queue_debug!("Timer {:?} armed for {:?}", timer, after);
                    self.timers.start(timer, after, now);
                }
                Effect::CancelTimer { timer } => {
                    self.timers.cancel(timer);
                }
                Effect::SnapshotChanged(sections) => self.view.on_snapshot_change(&sections),
                Effect::FallbackShown(fallback) => self.view.on_fallback(&fallback),
                Effect::PlaceholdersChanged(items) => self.view.on_placeholders_change(&items),
                Effect::BadgeChanged(badge) => self.view.on_badge_change(badge),
                Effect::ActiveCountChanged(count) => self.view.on_active_count(count),
                Effect::LoadingChanged(loading) => self.view.on_loading(loading),
                Effect::NoticeShown(notice) => self.view.on_notice(&notice),
                Effect::NoticeCleared => self.view.on_notice_cleared(),
            }
        }
    }
}

/// Turns an engine completion into the message the core expects.
pub fn engine_msg(event: EngineEvent, now: Timestamp) -> Msg {
    match event {
        EngineEvent::StatusFetched { request, result } => Msg::StatusFetched {
            request: RequestId(request),
            result: result.map_err(|err| err.to_string()),
            now,
        },
        EngineEvent::ActiveDownloadsFetched { result } => Msg::ActiveDownloadsFetched {
            result: result.map_err(|err| err.to_string()),
            now,
        },
        EngineEvent::SubmitCompleted { id, result } => Msg::SubmitFinished {
            id: JobId::new(id),
            result: result.map_err(|err| err.to_string()),
            now,
        },
        EngineEvent::CancelCompleted { id, result } => Msg::CancelFinished {
            id: JobId::new(id),
            result: result.map_err(|err| err.to_string()),
            now,
        },
        EngineEvent::ClearCompletedDone { result } => Msg::ClearCompletedFinished {
            result: result.map_err(|err| err.to_string()),
            now,
        },
    }
}
