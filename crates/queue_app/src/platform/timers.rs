use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use queue_core::{TimerId, Timestamp};

/// Maps wall-clock instants to the core's session-relative timestamps.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn at(&self, instant: Instant) -> Timestamp {
        instant.saturating_duration_since(self.started)
    }
}

/// Pending core timers, keyed by id. Re-arming an id moves its deadline.
#[derive(Debug, Default)]
pub struct TimerQueue {
    deadlines: BTreeMap<TimerId, Instant>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, timer: TimerId, after: Duration, now: Instant) {
        self.deadlines.insert(timer, now + after);
    }

    pub fn cancel(&mut self, timer: TimerId) -> bool {
        self.deadlines.remove(&timer).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every timer due at `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, TimerId)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(timer, deadline)| (*deadline, *timer))
            .collect();
        due.sort();
        for (_, timer) in &due {
            self.deadlines.remove(timer);
        }
        due.into_iter().map(|(_, timer)| timer).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }
}
