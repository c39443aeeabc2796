use std::collections::BTreeSet;

use crate::snapshot::{JobId, JobState, StatusSnapshot};

/// Number of active jobs without double counting: real queued/downloading
/// ids, plus optimistic ids not among them. An optimistic id whose real job
/// is completed or failed still counts, since the user asked for it again.
pub fn compute<'a, I>(real_jobs: I, optimistic_ids: &BTreeSet<JobId>) -> usize
where
    I: IntoIterator<Item = (&'a JobId, JobState)>,
{
    let active_real = active_ids(real_jobs);
    let optimistic_only = optimistic_ids
        .iter()
        .filter(|id| !active_real.contains(id))
        .count();
    active_real.len() + optimistic_only
}

fn active_ids<'a, I>(real_jobs: I) -> BTreeSet<&'a JobId>
where
    I: IntoIterator<Item = (&'a JobId, JobState)>,
{
    real_jobs
        .into_iter()
        .filter(|(_, state)| state.is_active())
        .map(|(id, _)| id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadgeTone {
    #[default]
    Idle,
    Downloading,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Badge {
    pub count: usize,
    pub tone: BadgeTone,
}

impl Badge {
    pub fn derive(snapshot: Option<&StatusSnapshot>, optimistic_ids: &BTreeSet<JobId>) -> Self {
        let real: Vec<(&JobId, JobState)> = snapshot
            .map(|s| s.jobs().map(|job| (&job.id, job.state)).collect())
            .unwrap_or_default();
        let count = compute(real.iter().copied(), optimistic_ids);

        // Cancelled jobs sit in the error bucket but are not failures.
        let has_error = snapshot.is_some_and(|s| {
            s.bucket(JobState::Error)
                .values()
                .any(|job| !job.cancelled)
        });
        let has_downloading =
            snapshot.is_some_and(|s| !s.bucket(JobState::Downloading).is_empty());
        let active_real = active_ids(real.iter().copied());
        let optimistic_only = optimistic_ids.iter().any(|id| !active_real.contains(id));

        let tone = if has_error {
            BadgeTone::Error
        } else if has_downloading || optimistic_only {
            BadgeTone::Downloading
        } else {
            BadgeTone::Idle
        };

        Self { count, tone }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Job;

    fn ids(values: &[&str]) -> BTreeSet<JobId> {
        values.iter().map(|value| JobId::from(*value)).collect()
    }

    #[test]
    fn optimistic_id_already_active_is_not_double_counted() {
        let snapshot = StatusSnapshot::from_jobs([
            Job::new("b1", "Dune", JobState::Downloading),
            Job::new("b2", "Emma", JobState::Queued),
        ]);
        let badge = Badge::derive(Some(&snapshot), &ids(&["b1", "b9"]));
        assert_eq!(badge.count, 3);
        assert_eq!(badge.tone, BadgeTone::Downloading);
    }

    #[test]
    fn terminal_jobs_are_not_active_but_a_repeat_request_counts() {
        let snapshot = StatusSnapshot::from_jobs([
            Job::new("done", "Done", JobState::Completed),
            Job::new("bad", "Bad", JobState::Error),
        ]);
        assert_eq!(Badge::derive(Some(&snapshot), &BTreeSet::new()).count, 0);

        let badge = Badge::derive(Some(&snapshot), &ids(&["done"]));
        assert_eq!(badge.count, 1);
        assert_eq!(badge.tone, BadgeTone::Error);
    }

    #[test]
    fn cancelled_jobs_do_not_turn_the_badge_red() {
        let snapshot = StatusSnapshot::from_jobs([
            Job::new("c1", "Dune", JobState::Error).cancelled(),
            Job::new("d1", "Emma", JobState::Downloading),
        ]);
        let badge = Badge::derive(Some(&snapshot), &BTreeSet::new());
        assert_eq!(
            badge,
            Badge {
                count: 1,
                tone: BadgeTone::Downloading,
            }
        );

        let only_cancelled =
            StatusSnapshot::from_jobs([Job::new("c1", "Dune", JobState::Error).cancelled()]);
        assert_eq!(
            Badge::derive(Some(&only_cancelled), &BTreeSet::new()).tone,
            BadgeTone::Idle
        );
    }

    #[test]
    fn optimistic_only_without_snapshot() {
        let badge = Badge::derive(None, &ids(&["a", "b"]));
        assert_eq!(badge.count, 2);
        assert_eq!(badge.tone, BadgeTone::Downloading);
        assert_eq!(Badge::derive(None, &BTreeSet::new()), Badge::default());
    }

    #[test]
    fn compute_matches_set_formula_over_many_inputs() {
        let states = JobState::ALL;
        // Deterministic sweep over small real/optimistic id universes.
        for mask in 0u32..(1 << 8) {
            let real: Vec<(JobId, JobState)> = (0u32..4)
                .filter(|bit| mask & (1 << *bit) != 0)
                .map(|bit| {
                    let state = states[((bit + mask) % 4) as usize];
                    (JobId::new(format!("id{bit}")), state)
                })
                .collect();
            let optimistic: BTreeSet<JobId> = (0u32..4)
                .filter(|bit| mask & (1 << (*bit + 4)) != 0)
                .map(|bit| JobId::new(format!("id{}", bit + 2)))
                .collect();

            let active_real: BTreeSet<&JobId> = real
                .iter()
                .filter(|(_, state)| state.is_active())
                .map(|(id, _)| id)
                .collect();
            let expected = active_real.len()
                + optimistic.iter().filter(|id| !active_real.contains(id)).count();

            let actual = compute(real.iter().map(|(id, state)| (id, *state)), &optimistic);
            assert_eq!(actual, expected, "mask {mask:#010b}");
        }
    }
}
