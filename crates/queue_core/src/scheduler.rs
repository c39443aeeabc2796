use std::time::Duration;

use queue_logging::queue_debug;

use crate::effect::Effect;
use crate::time::{RequestId, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    /// View closed or host page hidden.
    #[default]
    Suspended,
    /// Waiting for the next tick.
    Idle,
    Fetching,
    /// A background fetch failed; the retry timer is armed.
    RetryPending,
}

/// Why a status fetch was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    ViewOpened,
    PageVisible,
    Tick,
    Retry,
    ManualRefresh,
    /// Shortly after an optimistic add.
    QuickRefresh,
    /// After a successful submit, cancel or clear.
    FollowUp,
}

impl FetchTrigger {
    /// User-visible fetches show a loader and surface errors loudly.
    pub fn is_foreground(self) -> bool {
        matches!(
            self,
            FetchTrigger::ViewOpened | FetchTrigger::PageVisible | FetchTrigger::ManualRefresh
        )
    }

    pub fn bypasses_cache(self) -> bool {
        matches!(
            self,
            FetchTrigger::ManualRefresh | FetchTrigger::QuickRefresh | FetchTrigger::FollowUp
        )
    }

    /// One-shot fetches may run while suspended.
    pub fn is_one_shot(self) -> bool {
        matches!(self, FetchTrigger::QuickRefresh | FetchTrigger::FollowUp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub request: RequestId,
    pub trigger: FetchTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failure,
}

/// Drives periodic status refresh while the view is open and the page is
/// visible.
///
/// Every transition pushes the timer effects it needs onto the caller's
/// effect list; the scheduler itself never waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollScheduler {
    phase: PollPhase,
    view_open: bool,
    page_visible: bool,
    in_flight: Option<InFlight>,
    tick: Option<TimerId>,
    retry: Option<TimerId>,
    quick: Option<TimerId>,
    next_generation: u64,
    next_request: u64,
    interval: Duration,
    retry_delay: Duration,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(5))
    }
}

impl PollScheduler {
    pub fn new(interval: Duration, retry_delay: Duration) -> Self {
        Self {
            phase: PollPhase::Suspended,
            view_open: false,
            page_visible: true,
            in_flight: None,
            tick: None,
            retry: None,
            quick: None,
            next_generation: 0,
            next_request: 0,
            interval,
            retry_delay,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn view_open(&self) -> bool {
        self.view_open
    }

    pub fn page_visible(&self) -> bool {
        self.page_visible
    }

    pub fn is_active(&self) -> bool {
        self.view_open && self.page_visible
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    /// Returns true when the scheduler became active and wants a fetch.
    pub fn open_view(&mut self, effects: &mut Vec<Effect>) -> bool {
        if self.view_open {
            return false;
        }
        self.view_open = true;
        self.page_visible && self.activate(effects)
    }

    pub fn close_view(&mut self, effects: &mut Vec<Effect>) {
        self.view_open = false;
        self.suspend(effects);
    }

    /// Returns true when the page became visible with the view open.
    pub fn set_page_visible(&mut self, visible: bool, effects: &mut Vec<Effect>) -> bool {
        if self.page_visible == visible {
            return false;
        }
        self.page_visible = visible;
        if visible {
            self.view_open && self.activate(effects)
        } else {
            self.suspend(effects);
            false
        }
    }

    fn activate(&mut self, effects: &mut Vec<Effect>) -> bool {
        self.cancel_poll_timers(effects);
        self.phase = if self.in_flight.is_some() {
            PollPhase::Fetching
        } else {
            PollPhase::Idle
        };
        true
    }

    /// Cancels tick and retry. An in-flight fetch keeps running.
    pub fn suspend(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_poll_timers(effects);
        self.phase = PollPhase::Suspended;
    }

    /// Whether `trigger` would start a fetch right now.
    pub fn admits(&self, trigger: FetchTrigger) -> bool {
        self.in_flight.is_none() && (self.is_active() || trigger.is_one_shot())
    }

    /// Starts a fetch, or returns `None` when the in-flight guard or the
    /// suspended state refuses it.
    pub fn try_begin(
        &mut self,
        trigger: FetchTrigger,
        effects: &mut Vec<Effect>,
    ) -> Option<RequestId> {
        if !self.admits(trigger) {
            queue_debug!(
                "Fetch refused for {:?} (in flight: {:?}, phase: {:?})",
                trigger,
                self.in_flight,
                self.phase
            );
            return None;
        }
        if self.is_active() {
            self.cancel_poll_timers(effects);
            self.phase = PollPhase::Fetching;
        }
        self.next_request += 1;
        let request = RequestId(self.next_request);
        self.in_flight = Some(InFlight { request, trigger });
        Some(request)
    }

    /// A cycle satisfied from the cache: the next tick is armed as if a fetch
    /// had just succeeded.
    pub fn served_from_cache(&mut self, effects: &mut Vec<Effect>) {
        if !self.is_active() || self.in_flight.is_some() {
            return;
        }
        self.cancel_poll_timers(effects);
        self.arm_tick(effects);
        self.phase = PollPhase::Idle;
    }

    /// Completes the fetch identified by `request`. Returns its trigger, or
    /// `None` for a response nobody is waiting for.
    pub fn finish(
        &mut self,
        request: RequestId,
        outcome: FetchOutcome,
        effects: &mut Vec<Effect>,
    ) -> Option<FetchTrigger> {
        let in_flight = self.in_flight.filter(|f| f.request == request)?;
        self.in_flight = None;

        if !self.is_active() {
            self.phase = PollPhase::Suspended;
            return Some(in_flight.trigger);
        }

        match outcome {
            FetchOutcome::Failure if !in_flight.trigger.is_foreground() => {
                self.next_generation += 1;
                let timer = TimerId::Retry(self.next_generation);
                self.retry = Some(timer);
                effects.push(Effect::StartTimer {
                    timer,
                    after: self.retry_delay,
                });
                self.phase = PollPhase::RetryPending;
            }
            FetchOutcome::Success | FetchOutcome::Failure => {
                self.arm_tick(effects);
                self.phase = PollPhase::Idle;
            }
        }
        Some(in_flight.trigger)
    }

    /// Maps a fired timer to the fetch it asks for. Stale timers map to
    /// nothing.
    pub fn timer_fired(&mut self, timer: TimerId) -> Option<FetchTrigger> {
        if self.tick == Some(timer) {
            self.tick = None;
            Some(FetchTrigger::Tick)
        } else if self.retry == Some(timer) {
            self.retry = None;
            Some(FetchTrigger::Retry)
        } else if self.quick == Some(timer) {
            self.quick = None;
            Some(FetchTrigger::QuickRefresh)
        } else {
            None
        }
    }

    /// Arms the one-shot refresh that follows an optimistic add. Repeated
    /// adds push the deadline back instead of stacking fetches.
    pub fn arm_quick_refresh(&mut self, after: Duration, effects: &mut Vec<Effect>) {
        if let Some(timer) = self.quick.take() {
            effects.push(Effect::CancelTimer { timer });
        }
        self.next_generation += 1;
        let timer = TimerId::QuickRefresh(self.next_generation);
        self.quick = Some(timer);
        effects.push(Effect::StartTimer { timer, after });
    }

    fn arm_tick(&mut self, effects: &mut Vec<Effect>) {
        self.next_generation += 1;
        let timer = TimerId::PollTick(self.next_generation);
        self.tick = Some(timer);
        effects.push(Effect::StartTimer {
            timer,
            after: self.interval,
        });
    }

    fn cancel_poll_timers(&mut self, effects: &mut Vec<Effect>) {
        for timer in [self.tick.take(), self.retry.take()].into_iter().flatten() {
            effects.push(Effect::CancelTimer { timer });
        }
    }
}
