use std::collections::BTreeMap;
use std::time::Duration;

use crate::snapshot::{ActiveDownloads, StatusSnapshot};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKey {
    Status,
    ActiveDownloads,
}

/// Decoded payloads only: a response that fails to decode never reaches the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Status(StatusSnapshot),
    ActiveDownloads(ActiveDownloads),
}

impl CachedPayload {
    pub fn key(&self) -> ResourceKey {
        match self {
            CachedPayload::Status(_) => ResourceKey::Status,
            CachedPayload::ActiveDownloads(_) => ResourceKey::ActiveDownloads,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: CachedPayload,
    pub fetched_at: Timestamp,
}

/// Short-TTL memo of the two polled resources. One entry per key,
/// overwritten on every set; nothing is evicted otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCache {
    ttl: Duration,
    entries: BTreeMap<ResourceKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: BTreeMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_valid(&self, key: ResourceKey, now: Timestamp) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| now.saturating_sub(entry.fetched_at) < self.ttl)
    }

    /// Returns the entry regardless of age; check [`Self::is_valid`] first.
    pub fn get(&self, key: ResourceKey) -> Option<&CachedPayload> {
        self.entries.get(&key).map(|entry| &entry.value)
    }

    pub fn entry(&self, key: ResourceKey) -> Option<&CacheEntry> {
        self.entries.get(&key)
    }

    pub fn set(&mut self, value: CachedPayload, now: Timestamp) {
        self.entries.insert(
            value.key(),
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    pub fn invalidate(&mut self, key: ResourceKey) {
        self.entries.remove(&key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn valid_status(&self, now: Timestamp) -> Option<&StatusSnapshot> {
        if !self.is_valid(ResourceKey::Status, now) {
            return None;
        }
        match self.get(ResourceKey::Status) {
            Some(CachedPayload::Status(snapshot)) => Some(snapshot),
            _ => None,
        }
    }

    pub fn valid_active_downloads(&self, now: Timestamp) -> Option<&ActiveDownloads> {
        if !self.is_valid(ResourceKey::ActiveDownloads, now) {
            return None;
        }
        match self.get(ResourceKey::ActiveDownloads) {
            Some(CachedPayload::ActiveDownloads(active)) => Some(active),
            _ => None,
        }
    }
}
