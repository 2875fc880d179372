//! Directory cache keyed by project root.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Folders found under one root by one scan.
///
/// Snapshots are never edited once stored; stale ones are discarded whole and
/// replaced by a fresh scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Relative folder paths in scan order.
    pub directories: Vec<String>,

    /// When the scan finished.
    pub timestamp: DateTime<Utc>,
}

impl CacheSnapshot {
    /// Snapshot stamped with the current time.
    pub fn new(directories: Vec<String>) -> Self {
        Self::at(directories, Utc::now())
    }

    pub fn at(directories: Vec<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            directories,
            timestamp,
        }
    }

    /// See [`is_valid`].
    pub fn is_valid(&self, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
        is_valid(self, now, ttl_minutes)
    }
}

/// Whether `snapshot` may still be served at `now`.
///
/// True iff `ttl_minutes > 0` and less than `ttl_minutes` minutes have
/// passed since the snapshot was taken. The TTL is passed in rather than
/// stored so a settings change applies to snapshots already in the cache.
pub fn is_valid(snapshot: &CacheSnapshot, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
    ttl_minutes > 0
        && (now - snapshot.timestamp).num_milliseconds() < ttl_minutes.saturating_mul(60_000)
}

/// Storage for snapshots. Pure in-memory state; implementations do no I/O.
#[async_trait]
pub trait DirectoryCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<CacheSnapshot>>;

    async fn set(&self, key: &str, snapshot: CacheSnapshot);

    async fn delete(&self, key: &str);

    async fn clear(&self);
}

/// Default [`DirectoryCache`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Arc<CacheSnapshot>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots, valid or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Keys with a stored snapshot, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl DirectoryCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Arc<CacheSnapshot>> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, snapshot: CacheSnapshot) {
        debug!(
            "Caching {} directories for {key}",
            snapshot.directories.len()
        );
        self.entries
            .write()
            .await
            .insert(key.to_string(), Arc::new(snapshot));
    }

    async fn delete(&self, key: &str) {
        if self.entries.write().await.remove(key).is_some() {
            debug!("Invalidated cached directories for {key}");
        }
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Cleared directory cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn snapshot_aged(minutes: i64, now: DateTime<Utc>) -> CacheSnapshot {
        CacheSnapshot::at(vec!["src".to_string()], now - Duration::minutes(minutes))
    }

    #[test]
    fn test_fresh_snapshot_is_valid() {
        let now = Utc::now();
        assert!(snapshot_aged(0, now).is_valid(now, 60));
        assert!(snapshot_aged(59, now).is_valid(now, 60));
    }

    #[test]
    fn test_snapshot_expires_at_ttl() {
        let now = Utc::now();
        assert!(!snapshot_aged(60, now).is_valid(now, 60));
        assert!(!snapshot_aged(61, now).is_valid(now, 60));

        let just_inside = CacheSnapshot::at(
            Vec::new(),
            now - Duration::minutes(60) + Duration::milliseconds(1),
        );
        assert!(just_inside.is_valid(now, 60));
    }

    #[test]
    fn test_non_positive_ttl_disables_caching() {
        let now = Utc::now();
        assert!(!snapshot_aged(0, now).is_valid(now, 0));
        assert!(!snapshot_aged(0, now).is_valid(now, -5));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let now = Utc::now();
        assert!(snapshot_aged(10, now).is_valid(now, i64::MAX));
    }

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("file:///a/", CacheSnapshot::new(vec!["x".to_string()]))
            .await;

        let snapshot = cache.get("file:///a/").await.unwrap();
        assert_eq!(snapshot.directories, vec!["x".to_string()]);

        cache.delete("file:///a/").await;
        assert!(cache.get("file:///a/").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_set_replaces_whole_snapshot() {
        let cache = MemoryCache::new();
        cache
            .set("k", CacheSnapshot::new(vec!["a".to_string(), "b".to_string()]))
            .await;
        cache.set("k", CacheSnapshot::new(vec!["c".to_string()])).await;

        assert_eq!(cache.get("k").await.unwrap().directories, vec!["c".to_string()]);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = MemoryCache::new();
        cache.set("b", CacheSnapshot::new(Vec::new())).await;
        cache.set("a", CacheSnapshot::new(Vec::new())).await;
        assert_eq!(cache.keys().await, vec!["a".to_string(), "b".to_string()]);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
