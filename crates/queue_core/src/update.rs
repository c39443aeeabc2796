use queue_logging::{queue_debug, queue_info, queue_warn};

use crate::badge::Badge;
use crate::cache::CachedPayload;
use crate::render_gate::RenderGate;
use crate::scheduler::{FetchOutcome, FetchTrigger};
use crate::snapshot::{ActiveDownloads, JobId, StatusSnapshot};
use crate::time::{TimerId, Timestamp};
use crate::tracker::PendingJob;
use crate::view_model::{placeholders, FallbackView, Notice, RenderedSections};
use crate::{Effect, Msg, ResourceKey, SyncState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SyncState, msg: Msg) -> (SyncState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::ViewOpened { now } => {
            if state.scheduler.open_view(&mut effects) {
                start_cycle(&mut state, FetchTrigger::ViewOpened, now, &mut effects);
            }
        }
        Msg::ViewClosed => {
            state.scheduler.close_view(&mut effects);
            // A reopened panel starts blank and must render again.
            state.gate.forget();
            set_loading(&mut state, false, &mut effects);
        }
        Msg::PageVisibilityChanged { visible, now } => {
            if state.scheduler.set_page_visible(visible, &mut effects) {
                start_cycle(&mut state, FetchTrigger::PageVisible, now, &mut effects);
            } else if !visible {
                set_loading(&mut state, false, &mut effects);
            }
        }
        Msg::ManualRefresh { now } => {
            start_cycle(&mut state, FetchTrigger::ManualRefresh, now, &mut effects);
        }
        Msg::TimerFired { timer, now } => match timer {
            TimerId::FailSafe(_) => match state.tracker.expire(timer) {
                Some(item) => {
                    queue_info!("Optimistic item {} expired unconfirmed", item.id);
                    publish_tracker_change(&mut state, &mut effects);
                }
                None => queue_debug!("Ignoring stale fail-safe {:?}", timer),
            },
            _ => match state.scheduler.timer_fired(timer) {
                Some(trigger) => start_cycle(&mut state, trigger, now, &mut effects),
                None => queue_debug!("Ignoring stale timer {:?}", timer),
            },
        },
        Msg::StatusFetched {
            request,
            result,
            now,
        } => {
            let decoded = result.and_then(|payload| {
                StatusSnapshot::from_json(&payload).map_err(|err| err.to_string())
            });
            let outcome = if decoded.is_ok() {
                FetchOutcome::Success
            } else {
                FetchOutcome::Failure
            };
            let Some(trigger) = state.scheduler.finish(request, outcome, &mut effects) else {
                queue_debug!("Dropping status response {:?} nobody waits for", request);
                return (state, effects);
            };
            set_loading(&mut state, false, &mut effects);
            match decoded {
                Ok(snapshot) => {
                    state.cache.set(CachedPayload::Status(snapshot.clone()), now);
                    clear_notice(&mut state, &mut effects);
                    apply_snapshot(&mut state, snapshot, &mut effects);
                }
                Err(message) => {
                    handle_fetch_failure(&mut state, trigger, &message, now, &mut effects);
                }
            }
        }
        Msg::ActiveDownloadsFetched { result, now } => {
            state.active_in_flight = false;
            match result {
                Ok(payload) => {
                    let active = ActiveDownloads::from_json(&payload);
                    let count = active.count();
                    state.cache.set(CachedPayload::ActiveDownloads(active), now);
                    publish_active_count(&mut state, count, &mut effects);
                }
                Err(message) => {
                    queue_warn!("Active downloads fetch failed: {}", message);
                    let cached = state.cache.valid_active_downloads(now).map(|a| a.count());
                    if let Some(count) = cached {
                        publish_active_count(&mut state, count, &mut effects);
                    }
                }
            }
        }
        Msg::DownloadRequested { job, now } => {
            let id = job.id.clone();
            start_optimistic(&mut state, job, now, &mut effects);
            effects.push(Effect::SubmitDownload { id });
        }
        Msg::OptimisticStarted { job, now } => {
            start_optimistic(&mut state, job, now, &mut effects);
        }
        Msg::OptimisticFailed { id } => drop_optimistic(&mut state, &id, &mut effects),
        Msg::SubmitFinished { id, result, now } => match result {
            Ok(()) => {
                queue_info!("Download {} submitted", id);
                after_mutation(&mut state, FetchTrigger::FollowUp, now, &mut effects);
            }
            Err(message) => {
                queue_warn!("Download {} rejected: {}", id, message);
                drop_optimistic(&mut state, &id, &mut effects);
            }
        },
        Msg::CancelRequested { id } => effects.push(Effect::CancelDownload { id }),
        Msg::CancelFinished { id, result, now } => match result {
            Ok(()) => {
                queue_info!("Download {} cancelled", id);
                after_mutation(&mut state, FetchTrigger::FollowUp, now, &mut effects);
            }
            Err(message) => {
                queue_warn!("Cancelling {} failed: {}", id, message);
                let notice = Notice::action_failed("Failed to cancel download.");
                show_notice(&mut state, notice, &mut effects);
            }
        },
        Msg::ClearCompletedRequested => effects.push(Effect::ClearCompleted),
        Msg::ClearCompletedFinished { result, now } => match result {
            Ok(()) => {
                queue_info!("Completed downloads cleared");
                // An open panel refreshes loudly, like a manual refresh.
                let trigger = if state.scheduler.is_active() {
                    FetchTrigger::ManualRefresh
                } else {
                    FetchTrigger::FollowUp
                };
                after_mutation(&mut state, trigger, now, &mut effects);
            }
            Err(message) => {
                queue_warn!("Clearing completed downloads failed: {}", message);
                let notice = Notice::action_failed("Failed to clear completed downloads.");
                show_notice(&mut state, notice, &mut effects);
            }
        },
        Msg::NoOp => {}
    }

    (state, effects)
}

/// One poll cycle: cache check, then a fetch when the cache cannot answer.
fn start_cycle(
    state: &mut SyncState,
    trigger: FetchTrigger,
    now: Timestamp,
    effects: &mut Vec<Effect>,
) {
    if !state.scheduler.admits(trigger) {
        queue_debug!("Cycle for {:?} skipped", trigger);
        return;
    }
    let bypass = trigger.bypasses_cache();

    if !bypass {
        if let Some(snapshot) = state.cache.valid_status(now).cloned() {
            queue_debug!("Cycle for {:?} served from cache", trigger);
            apply_snapshot(state, snapshot, effects);
            state.scheduler.served_from_cache(effects);
            refresh_active_count(state, false, now, effects);
            return;
        }
    }

    let Some(request) = state.scheduler.try_begin(trigger, effects) else {
        return;
    };
    queue_debug!("Fetching status ({:?}, {:?})", trigger, request);
    if trigger.is_foreground() {
        set_loading(state, true, effects);
    }
    effects.push(Effect::FetchStatus { request });
    refresh_active_count(state, bypass, now, effects);
}

fn refresh_active_count(
    state: &mut SyncState,
    bypass: bool,
    now: Timestamp,
    effects: &mut Vec<Effect>,
) {
    if !bypass {
        if let Some(count) = state.cache.valid_active_downloads(now).map(|a| a.count()) {
            publish_active_count(state, count, effects);
            return;
        }
    }
    if !state.active_in_flight {
        state.active_in_flight = true;
        effects.push(Effect::FetchActiveDownloads);
    }
}

/// Reconcile, render, badge. The caller has already written the cache.
fn apply_snapshot(state: &mut SyncState, snapshot: StatusSnapshot, effects: &mut Vec<Effect>) {
    let committed = RenderGate::commit(&snapshot, &mut state.tracker);
    for item in &committed.confirmed {
        queue_debug!("Optimistic item {} confirmed by server", item.id);
        effects.push(Effect::CancelTimer {
            timer: item.fail_safe,
        });
    }
    if !committed.confirmed.is_empty() {
        effects.push(Effect::PlaceholdersChanged(placeholders(&state.tracker)));
    }

    if state.scheduler.is_active() {
        if state.gate.should_render(&snapshot) {
            queue_debug!("Rendering snapshot {}", snapshot.digest());
            effects.push(Effect::SnapshotChanged(RenderedSections::build(
                &snapshot,
                &state.tracker,
            )));
        }
    } else {
        queue_debug!("View not visible, render skipped");
    }

    state.last_snapshot = Some(snapshot);
    publish_badge(state, committed.badge, effects);
}

fn handle_fetch_failure(
    state: &mut SyncState,
    trigger: FetchTrigger,
    message: &str,
    now: Timestamp,
    effects: &mut Vec<Effect>,
) {
    queue_warn!("Status fetch for {:?} failed: {}", trigger, message);
    if !state.scheduler.is_active() {
        return;
    }

    match state.cache.valid_status(now).cloned() {
        Some(snapshot) => {
            apply_snapshot(state, snapshot, effects);
            let notice = if trigger.is_foreground() {
                Notice::load_failed()
            } else {
                Notice::stale_cache()
            };
            show_notice(state, notice, effects);
        }
        None => {
            state.gate.forget();
            effects.push(Effect::FallbackShown(FallbackView::from_tracker(
                &state.tracker,
            )));
            if trigger.is_foreground() {
                show_notice(state, Notice::load_failed(), effects);
            }
        }
    }
}

/// The server state changed under us: drop the cached snapshot and look again.
fn after_mutation(
    state: &mut SyncState,
    trigger: FetchTrigger,
    now: Timestamp,
    effects: &mut Vec<Effect>,
) {
    state.cache.invalidate(ResourceKey::Status);
    start_cycle(state, trigger, now, effects);
}

fn start_optimistic(
    state: &mut SyncState,
    job: PendingJob,
    now: Timestamp,
    effects: &mut Vec<Effect>,
) {
    queue_info!("Download {} requested, tracking optimistically", job.id);
    let added = state.tracker.add(job, now);
    if let Some(previous) = added.replaced {
        effects.push(Effect::CancelTimer {
            timer: previous.fail_safe,
        });
    }
    effects.push(Effect::StartTimer {
        timer: added.fail_safe,
        after: state.settings().fail_safe,
    });
    publish_tracker_change(state, effects);
    let quick_refresh = state.settings().quick_refresh;
    state.scheduler.arm_quick_refresh(quick_refresh, effects);
}

fn drop_optimistic(state: &mut SyncState, id: &JobId, effects: &mut Vec<Effect>) {
    match state.tracker.remove(id) {
        Some(item) => {
            effects.push(Effect::CancelTimer {
                timer: item.fail_safe,
            });
            publish_tracker_change(state, effects);
        }
        None => queue_debug!(
            "Submission failure for {} arrived after its placeholder was gone",
            id
        ),
    }
}

fn publish_tracker_change(state: &mut SyncState, effects: &mut Vec<Effect>) {
    effects.push(Effect::PlaceholdersChanged(placeholders(&state.tracker)));
    let badge = Badge::derive(state.last_snapshot.as_ref(), &state.tracker.ids());
    publish_badge(state, badge, effects);
}

fn publish_badge(state: &mut SyncState, badge: Badge, effects: &mut Vec<Effect>) {
    if state.last_badge != badge {
        state.last_badge = badge;
        effects.push(Effect::BadgeChanged(badge));
    }
}

fn publish_active_count(state: &mut SyncState, count: usize, effects: &mut Vec<Effect>) {
    if state.active_count != Some(count) {
        state.active_count = Some(count);
        effects.push(Effect::ActiveCountChanged(count));
    }
}

fn set_loading(state: &mut SyncState, loading: bool, effects: &mut Vec<Effect>) {
    if state.loading != loading {
        state.loading = loading;
        effects.push(Effect::LoadingChanged(loading));
    }
}

fn show_notice(state: &mut SyncState, notice: Notice, effects: &mut Vec<Effect>) {
    if state.notice.as_ref() != Some(&notice) {
        state.notice = Some(notice.clone());
        effects.push(Effect::NoticeShown(notice));
    }
}

fn clear_notice(state: &mut SyncState, effects: &mut Vec<Effect>) {
    if state.notice.take().is_some() {
        effects.push(Effect::NoticeCleared);
    }
}
