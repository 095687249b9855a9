use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::store::{KeyValueStore, StoreError};

/// How often the server sweeps expired entries out of the in-memory store.
pub const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process [`KeyValueStore`] backed by a [`DashMap`].
///
/// Expired entries are invisible to [`get`](KeyValueStore::get) and are dropped lazily when
/// read, or in bulk by [`MemoryStore::purge_expired`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Runs [`purge_expired`](Self::purge_expired) every `every` on `tracker` until
    /// `shutdown` is cancelled.
    pub fn spawn_purge(&self, every: Duration, tracker: &TaskTracker, shutdown: CancellationToken) {
        let store = self.clone();
        tracker.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = store.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, remaining = store.len(), "Purged expired entries");
                        }
                    }
                }
            }
        });
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Read guard released above; dashmap would deadlock otherwise
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store
            .set_ex("split:a", "one".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("split:a").await.unwrap(), Some("one".to_string()));
        assert_eq!(store.get("split:b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("k", "one".to_string(), ttl).await.unwrap();
        store.set_ex("k", "two".to_string(), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("two".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_dropped() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store
            .set_ex("short", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .set_ex("long", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_background_purge_drops_unread_entries() {
        let store = MemoryStore::new();
        let tracker = TaskTracker::new();
        let shutdown = CancellationToken::new();
        store.spawn_purge(Duration::from_millis(10), &tracker, shutdown.clone());
        tracker.close();

        store
            .set_ex("short", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .set_ex("long", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.len(), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("purge task stops on shutdown");
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v".to_string(), Duration::MAX)
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }
}
