use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Server-assigned job identifier (the book id). Also the join key between
/// optimistic placeholders and confirmed jobs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobState {
    Queued,
    Downloading,
    Completed,
    Error,
}

impl JobState {
    /// Render order of the status buckets.
    pub const ALL: [JobState; 4] = [
        JobState::Queued,
        JobState::Downloading,
        JobState::Completed,
        JobState::Error,
    ];

    /// Queued and downloading jobs count towards the badge.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Queued | JobState::Downloading)
    }

    pub fn bucket_name(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Error => "error",
        }
    }

    /// Maps a wire bucket name onto a state. The server also reports `done`,
    /// `available` and `cancelled`, which fold into the terminal buckets.
    fn from_bucket(name: &str) -> Option<Self> {
        match name {
            "queued" => Some(JobState::Queued),
            "downloading" => Some(JobState::Downloading),
            "completed" | "done" | "available" => Some(JobState::Completed),
            "error" | "cancelled" => Some(JobState::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub state: JobState,
    pub progress: Option<f64>,
    pub download_path: Option<String>,
    /// Listed under `cancelled` on the wire; kept in the error bucket.
    pub cancelled: bool,
}

impl Job {
    pub fn new(id: impl Into<JobId>, title: impl Into<String>, state: JobState) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            state,
            progress: None,
            download_path: None,
            cancelled: false,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress.clamp(0.0, 100.0));
        self
    }

    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = Some(path.into());
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("status payload is not a JSON object")]
    NotAnObject,
    #[error("bucket `{bucket}` is not a JSON object")]
    BucketNotObject { bucket: String },
    #[error("job `{key}` in bucket `{bucket}` is not a JSON object")]
    JobNotObject { bucket: String, key: String },
    #[error("job `{key}` in bucket `{bucket}` is invalid: {reason}")]
    InvalidRecord {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// SHA-256 over the canonical form of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotDigest([u8; 32]);

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().take(6) {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Point-in-time server view of every tracked job, bucketed by state.
///
/// Buckets are ordered maps, so two snapshots carrying the same jobs have the
/// same digest regardless of key order on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    queued: BTreeMap<JobId, Job>,
    downloading: BTreeMap<JobId, Job>,
    completed: BTreeMap<JobId, Job>,
    error: BTreeMap<JobId, Job>,
}

impl StatusSnapshot {
    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut snapshot = Self::default();
        for job in jobs {
            snapshot.insert(job);
        }
        snapshot
    }

    /// Decodes the status endpoint payload. A `null` bucket counts as empty;
    /// unknown bucket names are skipped.
    pub fn from_json(payload: &Value) -> Result<Self, SnapshotError> {
        let buckets = payload.as_object().ok_or(SnapshotError::NotAnObject)?;
        let mut snapshot = Self::default();
        for (bucket, items) in buckets {
            let Some(state) = JobState::from_bucket(bucket) else {
                queue_logging::queue_debug!("ignoring unknown status bucket `{}`", bucket);
                continue;
            };
            let items = match items {
                Value::Null => continue,
                Value::Object(items) => items,
                _ => {
                    return Err(SnapshotError::BucketNotObject {
                        bucket: bucket.clone(),
                    })
                }
            };
            for (key, record) in items {
                if !record.is_object() {
                    return Err(SnapshotError::JobNotObject {
                        bucket: bucket.clone(),
                        key: key.clone(),
                    });
                }
                let record = JobRecord::deserialize(record).map_err(|err| {
                    SnapshotError::InvalidRecord {
                        bucket: bucket.clone(),
                        key: key.clone(),
                        reason: err.to_string(),
                    }
                })?;
                snapshot.insert(record.into_job(key, state, bucket == "cancelled"));
            }
        }
        Ok(snapshot)
    }

    pub fn insert(&mut self, job: Job) {
        self.bucket_mut(job.state).insert(job.id.clone(), job);
    }

    pub fn bucket(&self, state: JobState) -> &BTreeMap<JobId, Job> {
        match state {
            JobState::Queued => &self.queued,
            JobState::Downloading => &self.downloading,
            JobState::Completed => &self.completed,
            JobState::Error => &self.error,
        }
    }

    fn bucket_mut(&mut self, state: JobState) -> &mut BTreeMap<JobId, Job> {
        match state {
            JobState::Queued => &mut self.queued,
            JobState::Downloading => &mut self.downloading,
            JobState::Completed => &mut self.completed,
            JobState::Error => &mut self.error,
        }
    }

    /// Every job, bucket by bucket in render order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        JobState::ALL
            .into_iter()
            .flat_map(move |state| self.bucket(state).values())
    }

    /// Ids present in any bucket.
    pub fn ids(&self) -> BTreeSet<JobId> {
        self.jobs().map(|job| job.id.clone()).collect()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        JobState::ALL
            .into_iter()
            .any(|state| self.bucket(state).contains_key(id))
    }

    pub fn len(&self) -> usize {
        JobState::ALL
            .into_iter()
            .map(|state| self.bucket(state).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn digest(&self) -> SnapshotDigest {
        let mut hasher = Sha256::new();
        for state in JobState::ALL {
            let bucket = self.bucket(state);
            hasher.update(state.bucket_name().as_bytes());
            hasher.update((bucket.len() as u64).to_le_bytes());
            for job in bucket.values() {
                hash_str(&mut hasher, job.id.as_str());
                hash_str(&mut hasher, &job.title);
                match job.progress {
                    Some(progress) => {
                        hasher.update([1u8]);
                        hasher.update(progress.to_bits().to_le_bytes());
                    }
                    None => hasher.update([0u8]),
                }
                match &job.download_path {
                    Some(path) => {
                        hasher.update([1u8]);
                        hash_str(&mut hasher, path);
                    }
                    None => hasher.update([0u8]),
                }
                hasher.update([u8::from(job.cancelled)]);
            }
        }
        SnapshotDigest(hasher.finalize().into())
    }
}

// Length-prefixed so adjacent fields cannot run together.
fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// One job as the status endpoint lists it. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct JobRecord {
    id: Option<String>,
    title: Option<String>,
    progress: Option<f64>,
    download_path: Option<String>,
}

impl JobRecord {
    fn into_job(self, key: &str, state: JobState, cancelled: bool) -> Job {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| key.to_string());
        Job {
            id: JobId::new(id),
            title: self.title.unwrap_or_default(),
            state,
            progress: self.progress.map(|p| p.clamp(0.0, 100.0)),
            download_path: self.download_path,
            cancelled,
        }
    }
}

/// Decoded payload of the active-downloads endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveDownloads {
    pub ids: Vec<String>,
}

impl ActiveDownloads {
    /// Lenient like the status panel it feeds: anything but an array under
    /// `active_downloads` reads as no active downloads.
    pub fn from_json(payload: &Value) -> Self {
        let ids = payload
            .get("active_downloads")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(id) => id.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { ids }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_buckets_and_folds_server_aliases() {
        let payload = json!({
            "queued": { "a": { "id": "a", "title": "Dune" } },
            "downloading": { "b": { "id": "b", "title": "Emma", "progress": 42.4 } },
            "done": { "c": { "id": "c", "title": "Ulysses", "download_path": "/books/c.epub" } },
            "cancelled": { "d": { "title": "Beowulf" } },
            "unknown": { "e": { "id": "e" } }
        });

        let snapshot = StatusSnapshot::from_json(&payload).unwrap();

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.bucket(JobState::Completed).len(), 1);
        assert_eq!(
            snapshot.bucket(JobState::Downloading)[&JobId::from("b")].progress,
            Some(42.4)
        );
        assert!(snapshot.bucket(JobState::Error)[&JobId::from("d")].cancelled);
        assert!(!snapshot.bucket(JobState::Downloading)[&JobId::from("b")].cancelled);
        assert!(!snapshot.contains(&JobId::from("e")));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert_eq!(
            StatusSnapshot::from_json(&json!(null)),
            Err(SnapshotError::NotAnObject)
        );
        assert_eq!(
            StatusSnapshot::from_json(&json!({ "queued": [1, 2] })),
            Err(SnapshotError::BucketNotObject {
                bucket: "queued".into()
            })
        );
        assert!(matches!(
            StatusSnapshot::from_json(&json!({ "queued": { "x": "oops" } })),
            Err(SnapshotError::JobNotObject { .. })
        ));
        assert!(matches!(
            StatusSnapshot::from_json(&json!({ "queued": { "x": { "progress": "half" } } })),
            Err(SnapshotError::InvalidRecord { key, .. }) if key == "x"
        ));
    }

    #[test]
    fn null_buckets_are_empty_and_progress_is_clamped() {
        let payload = json!({
            "queued": null,
            "downloading": { "a": { "progress": 180 } }
        });
        let snapshot = StatusSnapshot::from_json(&payload).unwrap();
        assert_eq!(
            snapshot.bucket(JobState::Downloading)[&JobId::from("a")].progress,
            Some(100.0)
        );
        assert!(snapshot.bucket(JobState::Queued).is_empty());
    }

    #[test]
    fn digest_ignores_wire_key_order() {
        let first: Value = serde_json::from_str(
            r#"{"queued":{"a":{"id":"a","title":"A"},"b":{"id":"b","title":"B"}},"error":{}}"#,
        )
        .unwrap();
        let second: Value = serde_json::from_str(
            r#"{"error":{},"queued":{"b":{"title":"B","id":"b"},"a":{"title":"A","id":"a"}}}"#,
        )
        .unwrap();

        let first = StatusSnapshot::from_json(&first).unwrap();
        let second = StatusSnapshot::from_json(&second).unwrap();
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn digest_changes_with_progress() {
        let before = StatusSnapshot::from_jobs([
            Job::new("a", "A", JobState::Downloading).with_progress(10.0)
        ]);
        let after = StatusSnapshot::from_jobs([
            Job::new("a", "A", JobState::Downloading).with_progress(11.0)
        ]);
        assert_ne!(before.digest(), after.digest());
    }

    #[test]
    fn active_downloads_tolerates_missing_field() {
        assert_eq!(ActiveDownloads::from_json(&json!({})).count(), 0);
        assert_eq!(
            ActiveDownloads::from_json(&json!({ "active_downloads": ["a", 7] })).ids,
            vec!["a".to_string(), "7".to_string()]
        );
    }
}
