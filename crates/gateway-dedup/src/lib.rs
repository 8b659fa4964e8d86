#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-dedup** – in-memory TTL cache of recently processed event
//! fingerprints, consulted alongside the durable store so a fingerprint
//! seen before a process restart is still recognized.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use gateway_store_core::ProcessedEventStore;
use gateway_types::{DedupRecord, EventFingerprint, EventId};

/// Default sliding window: a fingerprint is fresh for 5 minutes.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default size ceiling triggering proactive eviction of stale entries.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A process-local, concurrency-safe dedup cache backed by a durable store
/// for cross-restart recognition.
pub struct DedupCache<S: ProcessedEventStore> {
    entries: DashMap<EventFingerprint, Instant>,
    window: Duration,
    capacity: usize,
    durable: Arc<S>,
}

impl<S: ProcessedEventStore> DedupCache<S> {
    /// Creates a cache with the default window and capacity.
    pub fn new(durable: Arc<S>) -> Self {
        Self::with_config(durable, DEFAULT_WINDOW, DEFAULT_CAPACITY)
    }

    /// Creates a cache with an explicit window and capacity.
    pub fn with_config(durable: Arc<S>, window: Duration, capacity: usize) -> Self {
        Self { entries: DashMap::new(), window, capacity, durable }
    }

    /// Checks whether `fingerprint` is a duplicate, consulting the
    /// in-memory cache first and the durable store second; a hit in either
    /// qualifies the event as duplicate. On a miss, records the
    /// fingerprint in both.
    pub async fn check_and_record(&self, fingerprint: &EventFingerprint, event_id: &EventId) -> bool {
        let now = Instant::now();
        if let Some(first_seen) = self.entries.get(fingerprint) {
            if now.duration_since(*first_seen) < self.window {
                return true;
            }
        }

        let is_new = self
            .durable
            .record_if_new(DedupRecord { fingerprint: fingerprint.clone(), first_seen_at: Utc::now(), event_id: event_id.clone() })
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "dedup durable check failed, treating as not-duplicate");
                true
            });

        if !is_new {
            return true;
        }

        self.entries.insert(fingerprint.clone(), now);
        if self.entries.len() > self.capacity {
            self.evict_stale(now);
        }
        false
    }

    /// Removes every in-memory entry older than the sliding window.
    pub fn evict_stale(&self, now: Instant) {
        self.entries.retain(|_, first_seen| now.duration_since(*first_seen) < self.window);
    }

    /// Current number of in-memory entries, for diagnostics and tests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the in-memory cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_store_memory::MemoryStore;

    fn fp(seed: &str) -> EventFingerprint {
        EventFingerprint::compute("order.created", &serde_json::json!({"seed": seed}), "tenant-1")
    }

    #[tokio::test]
    async fn first_sighting_is_not_duplicate() {
        let cache = DedupCache::new(Arc::new(MemoryStore::new()));
        let dup = cache.check_and_record(&fp("a"), &EventId::from("e1")).await;
        assert!(!dup);
    }

    #[tokio::test]
    async fn repeat_within_window_is_duplicate() {
        let cache = DedupCache::new(Arc::new(MemoryStore::new()));
        let f = fp("b");
        assert!(!cache.check_and_record(&f, &EventId::from("e1")).await);
        assert!(cache.check_and_record(&f, &EventId::from("e2")).await);
    }

    #[tokio::test]
    async fn durable_hit_is_duplicate_even_without_in_memory_entry() {
        let store = Arc::new(MemoryStore::new());
        let f = fp("c");
        // Simulate a prior process having recorded this fingerprint.
        store
            .record_if_new(DedupRecord { fingerprint: f.clone(), first_seen_at: Utc::now(), event_id: EventId::from("e0") })
            .await
            .unwrap();

        let cache = DedupCache::new(store);
        assert!(cache.check_and_record(&f, &EventId::from("e1")).await);
    }

    #[test]
    fn evict_stale_drops_entries_past_the_window() {
        let cache: DedupCache<MemoryStore> = DedupCache::with_config(Arc::new(MemoryStore::new()), Duration::from_millis(1), 1000);
        cache.entries.insert(fp("d"), Instant::now() - Duration::from_secs(10));
        cache.evict_stale(Instant::now());
        assert!(cache.is_empty());
    }
}
