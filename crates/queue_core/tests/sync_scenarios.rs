mod common;

use common::{badge_changes, fetches, rendered, secs, single_fetch, status_with, Harness};
use pretty_assertions::assert_eq;
use queue_core::{
    Badge, BadgeTone, Effect, JobId, Msg, NoticeLevel, PendingJob, PollPhase, TimerId,
};

#[test]
fn download_click_counts_before_any_response() {
    let mut harness = Harness::new();
    harness.open_with(common::empty_status());

    let effects = harness.send(Msg::DownloadRequested {
        job: PendingJob::new("b1", "Dune"),
        now: harness.now(),
    });

    assert!(harness.state().tracker().has(&JobId::from("b1")));
    assert_eq!(
        badge_changes(&effects),
        vec![Badge {
            count: 1,
            tone: BadgeTone::Downloading,
        }]
    );
    assert!(effects.contains(&Effect::SubmitDownload {
        id: JobId::from("b1")
    }));
    assert!(effects.contains(&Effect::StartTimer {
        timer: TimerId::FailSafe(1),
        after: secs(30),
    }));
    assert!(fetches(&effects).is_empty());
}

#[test]
fn confirmed_job_replaces_placeholder_without_double_count() {
    let mut harness = Harness::new();
    harness.open_with(common::empty_status());
    harness.send(Msg::DownloadRequested {
        job: PendingJob::new("b1", "Dune"),
        now: harness.now(),
    });

    let effects = harness.advance(secs(1));
    let request = single_fetch(&effects);
    let effects = harness.respond_status(request, status_with("downloading", "b1", "Dune"));

    assert!(!harness.state().tracker().has(&JobId::from("b1")));
    assert!(effects.contains(&Effect::CancelTimer {
        timer: TimerId::FailSafe(1)
    }));
    assert!(effects.contains(&Effect::PlaceholdersChanged(Vec::new())));
    assert!(rendered(&effects));
    assert!(badge_changes(&effects).is_empty());
    assert_eq!(harness.state().badge().count, 1);
    assert!(!harness.armed().contains(&TimerId::FailSafe(1)));
}

#[test]
fn identical_polls_do_not_render_twice() {
    let mut harness = Harness::new();
    let payload = status_with("queued", "q1", "Emma");
    let effects = harness.open_with(payload.clone());
    assert!(rendered(&effects));

    let effects = harness.advance(secs(10));
    let request = single_fetch(&effects);
    let effects = harness.respond_status(request, payload);

    assert!(!rendered(&effects));
    assert!(badge_changes(&effects).is_empty());
    assert_eq!(harness.state().scheduler().phase(), PollPhase::Idle);
}

#[test]
fn background_failure_serves_fresh_cache_and_retries() {
    let mut harness = Harness::new();
    harness.open_with(status_with("downloading", "x", "Dune"));
    harness.advance(secs(2));
    harness.send(Msg::DownloadRequested {
        job: PendingJob::new("b2", "Emma"),
        now: harness.now(),
    });

    // Quick refresh at t=3 runs in the background.
    let effects = harness.advance(secs(1));
    let request = single_fetch(&effects);
    let effects = harness.fail_status(request, "connection reset");

    assert_eq!(harness.state().scheduler().phase(), PollPhase::RetryPending);
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::StartTimer { timer: TimerId::Retry(_), after } if *after == secs(5)
    )));
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::FallbackShown(_))));
    let notice = harness.state().view().notice.expect("stale cache notice");
    assert_eq!(notice.level, NoticeLevel::Subtle);
    assert!(!notice.offers_retry);
    assert!(harness.state().last_snapshot().is_some());

    // Retry at t=8: the entry written at t=0 has just expired.
    let effects = harness.advance(secs(5));
    assert_eq!(fetches(&effects).len(), 1);
    assert_eq!(harness.now(), secs(8));
}

#[test]
fn unconfirmed_item_expires_after_fail_safe() {
    let mut harness = Harness::new();
    harness.send(Msg::OptimisticStarted {
        job: PendingJob::new("b2", "Emma"),
        now: harness.now(),
    });
    assert_eq!(harness.state().badge().count, 1);

    harness.advance(secs(29));
    assert!(harness.state().tracker().has(&JobId::from("b2")));

    let effects = harness.advance(secs(1));
    assert!(!harness.state().tracker().has(&JobId::from("b2")));
    assert_eq!(badge_changes(&effects), vec![Badge::default()]);
    assert!(effects.contains(&Effect::PlaceholdersChanged(Vec::new())));
}

#[test]
fn repeat_download_of_finished_job_counts_immediately() {
    let mut harness = Harness::new();
    harness.open_with(status_with("completed", "b1", "Dune"));
    assert_eq!(harness.state().badge().count, 0);

    let effects = harness.send(Msg::DownloadRequested {
        job: PendingJob::new("b1", "Dune"),
        now: harness.now(),
    });

    assert_eq!(
        badge_changes(&effects),
        vec![Badge {
            count: 1,
            tone: BadgeTone::Downloading,
        }]
    );
}

#[test]
fn cancelled_jobs_leave_the_badge_idle() {
    let mut harness = Harness::new();
    harness.open_with(status_with("cancelled", "c1", "Dune"));

    assert_eq!(harness.state().badge(), Badge::default());
    let snapshot = harness.state().last_snapshot().expect("snapshot applied");
    assert_eq!(snapshot.len(), 1);
}
