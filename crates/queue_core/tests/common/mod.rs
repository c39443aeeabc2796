#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;
use std::time::Duration;

use queue_core::{update, Effect, Msg, RequestId, SyncSettings, SyncState, TimerId, Timestamp};
use serde_json::{json, Value};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(queue_logging::initialize_for_tests);
}

pub fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

/// Drives `update` against a virtual clock and plays the runtime's part for
/// timers: armed timers fire in deadline order as time advances.
pub struct Harness {
    state: SyncState,
    now: Timestamp,
    timers: BTreeMap<TimerId, Timestamp>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SyncSettings::default())
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        init_logging();
        Self {
            state: SyncState::with_settings(settings),
            now: Duration::ZERO,
            timers: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn armed(&self) -> Vec<TimerId> {
        self.timers.keys().copied().collect()
    }

    pub fn send(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (next, effects) = update(state, msg);
        self.state = next;
        for effect in &effects {
            match effect {
                Effect::StartTimer { timer, after } => {
                    self.timers.insert(*timer, self.now + *after);
                }
                Effect::CancelTimer { timer } => {
                    self.timers.remove(timer);
                }
                _ => {}
            }
        }
        effects
    }

    /// Moves the clock forward, firing every timer that falls due on the way.
    pub fn advance(&mut self, by: Duration) -> Vec<Effect> {
        let target = self.now + by;
        let mut effects = Vec::new();
        loop {
            let due = self
                .timers
                .iter()
                .filter(|(_, deadline)| **deadline <= target)
                .min_by_key(|(timer, deadline)| (**deadline, **timer))
                .map(|(timer, deadline)| (*timer, *deadline));
            let Some((timer, deadline)) = due else {
                break;
            };
            self.timers.remove(&timer);
            self.now = deadline;
            effects.extend(self.send(Msg::TimerFired {
                timer,
                now: deadline,
            }));
        }
        self.now = target;
        effects
    }

    pub fn respond_status(&mut self, request: RequestId, payload: Value) -> Vec<Effect> {
        let now = self.now;
        self.send(Msg::StatusFetched {
            request,
            result: Ok(payload),
            now,
        })
    }

    pub fn fail_status(&mut self, request: RequestId, message: &str) -> Vec<Effect> {
        let now = self.now;
        self.send(Msg::StatusFetched {
            request,
            result: Err(message.to_string()),
            now,
        })
    }

    pub fn respond_active(&mut self, ids: &[&str]) -> Vec<Effect> {
        let now = self.now;
        self.send(Msg::ActiveDownloadsFetched {
            result: Ok(json!({ "active_downloads": ids })),
            now,
        })
    }

    /// Opens the view and answers its first fetches.
    pub fn open_with(&mut self, payload: Value) -> Vec<Effect> {
        let now = self.now;
        let mut effects = self.send(Msg::ViewOpened { now });
        let request = single_fetch(&effects);
        effects.extend(self.respond_status(request, payload));
        effects.extend(self.respond_active(&[]));
        effects
    }
}

pub fn fetches(effects: &[Effect]) -> Vec<RequestId> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::FetchStatus { request } => Some(*request),
            _ => None,
        })
        .collect()
}

pub fn single_fetch(effects: &[Effect]) -> RequestId {
    let requests = fetches(effects);
    assert_eq!(requests.len(), 1, "expected one status fetch in {effects:?}");
    requests[0]
}

pub fn rendered(effects: &[Effect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, Effect::SnapshotChanged(_)))
}

pub fn badge_changes(effects: &[Effect]) -> Vec<queue_core::Badge> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::BadgeChanged(badge) => Some(*badge),
            _ => None,
        })
        .collect()
}

pub fn empty_status() -> Value {
    json!({ "queued": {}, "downloading": {}, "completed": {}, "error": {} })
}

pub fn status_with(bucket: &str, id: &str, title: &str) -> Value {
    json!({
        "queued": {},
        "downloading": {},
        "completed": {},
        "error": {},
        bucket: { id: { "id": id, "title": title, "progress": 40.0 } },
    })
}
