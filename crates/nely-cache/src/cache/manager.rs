use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::store::{KeyValueStore, StoreError};

use super::durations;
use super::entry::CacheEntry;

/// Prefix applied to every logical key before it reaches the store.
/// Changing it orphans everything written under the old prefix.
pub const DEFAULT_NAMESPACE: &str = "@nely_cache:";

/// Failures inside the cache. Never returned to callers: every public
/// operation logs them and falls back to a miss or a no-op.
#[derive(Error, Debug)]
enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Corrupt cache record: {0}")]
    Serialization(#[from] serde_json::Error),
}

type CacheResult<T> = Result<T, CacheError>;

/// Counts of namespaced records, for inspection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
}

/// Expiring, namespaced cache over a [`KeyValueStore`].
///
/// Best effort by contract: reads that fail for any reason are misses, and
/// writes, removals and clears that fail are logged and dropped. Expired
/// records are only deleted when they are read (or by `clear_all`).
pub struct Cache<S> {
    store: S,
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> Cache<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source (tests, simulations).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespaced_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    // ===== Read =====

    /// Cached value for `key`, or `None` if missing, expired or unreadable.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_entry(key).await.map(CacheEntry::into_data)
    }

    /// Like [`read`](Self::read) but keeps the entry's timestamps.
    pub async fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.try_read_entry(key).await {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn try_read_entry<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> CacheResult<Option<CacheEntry<T>>> {
        let storage_key = self.namespaced_key(key);
        let Some(raw) = self.store.get(&storage_key).await? else {
            return Ok(None);
        };

        // Expiry is decided before the payload is typed, so an expired record
        // is evicted even when it no longer matches `T`.
        let entry: CacheEntry<serde_json::Value> = serde_json::from_str(&raw)?;
        if entry.is_expired(self.clock.now_millis()) {
            debug!(key, expired_at = entry.expires_at, "Evicting expired cache entry");
            self.store.remove(&storage_key).await?;
            return Ok(None);
        }
        Ok(Some(CacheEntry {
            data: serde_json::from_value(entry.data)?,
            timestamp: entry.timestamp,
            expires_at: entry.expires_at,
        }))
    }

    // ===== Write =====

    /// Store `data` for the default (medium) duration.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        self.write_with_ttl(key, data, durations::MEDIUM).await
    }

    /// Store `data`, replacing any previous entry, valid for `ttl`.
    pub async fn write_with_ttl<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) {
        if let Err(e) = self.try_write(key, data, ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }

    async fn try_write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let entry = CacheEntry::new(data, self.clock.now_millis(), ttl);
        let contents = serde_json::to_string(&entry)?;
        self.store.set(&self.namespaced_key(key), contents).await?;
        Ok(())
    }

    // ===== Evict =====

    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(&self.namespaced_key(key)).await {
            warn!(key, error = %e, "Cache remove failed");
        }
    }

    /// Delete every record under this cache's namespace, and nothing else.
    pub async fn clear_all(&self) {
        match self.try_clear_all().await {
            Ok(count) => debug!(count, namespace = %self.namespace, "Cache cleared"),
            Err(e) => warn!(namespace = %self.namespace, error = %e, "Cache clear failed"),
        }
    }

    async fn try_clear_all(&self) -> CacheResult<usize> {
        let keys = self.own_storage_keys().await?;
        if !keys.is_empty() {
            self.store.multi_remove(&keys).await?;
        }
        Ok(keys.len())
    }

    async fn own_storage_keys(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .store
            .all_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(&self.namespace))
            .collect())
    }

    // ===== Inspection =====

    /// Logical keys (namespace stripped) currently held, expired ones included.
    pub async fn keys(&self) -> Vec<String> {
        match self.own_storage_keys().await {
            Ok(keys) => {
                let mut keys: Vec<String> = keys
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&self.namespace).map(str::to_string))
                    .collect();
                keys.sort();
                keys
            }
            Err(e) => {
                debug!(error = %e, "Failed to list cache keys");
                Vec::new()
            }
        }
    }

    /// Counts records without evicting anything. Unreadable records count
    /// as entries but not as expired.
    pub async fn stats(&self) -> CacheStats {
        match self.try_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                debug!(error = %e, "Failed to collect cache stats");
                CacheStats::default()
            }
        }
    }

    async fn try_stats(&self) -> CacheResult<CacheStats> {
        let now = self.clock.now_millis();
        let mut stats = CacheStats::default();
        for key in self.own_storage_keys().await? {
            stats.entries += 1;
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            if let Ok(entry) = serde_json::from_str::<CacheEntry<serde::de::IgnoredAny>>(&raw) {
                if entry.is_expired(now) {
                    stats.expired += 1;
                }
            }
        }
        Ok(stats)
    }

    // ===== Read-through =====

    /// Serve `key` from cache, or run `fetch` and cache its result.
    ///
    /// A fetch error is returned as-is and nothing is cached. The cache
    /// itself never adds an error of its own.
    pub async fn read_through<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.read(key).await {
            debug!(key, "Cache hit");
            return Ok(cached);
        }

        debug!(key, "Cache miss, fetching");
        let fresh = fetch().await?;
        self.write_with_ttl(key, &fresh, ttl).await;
        Ok(fresh)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::cache::keys;
    use crate::clock::ManualClock;
    use crate::store::{FileStore, MemoryStore, StoreResult};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Vitals {
        systolic: u32,
        diastolic: u32,
    }

    fn cache() -> (Cache<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        (Cache::new(MemoryStore::new()).with_clock(clock.clone()), clock)
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn set(&self, _key: &str, _value: String) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn all_keys(&self) -> StoreResult<Vec<String>> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_vital_signs_round_trip_then_expire() {
        let (cache, clock) = cache();
        let readings = vec![Vitals { systolic: 120, diastolic: 80 }];

        cache
            .write_with_ttl("vital_signs_elder42", &readings, durations::SHORT)
            .await;
        assert_eq!(
            cache.read::<Vec<Vitals>>("vital_signs_elder42").await,
            Some(readings)
        );

        clock.advance(Duration::from_millis(121_000));
        assert_eq!(cache.read::<Vec<Vitals>>("vital_signs_elder42").await, None);
    }

    #[tokio::test]
    async fn test_expired_read_deletes_record() {
        let (cache, clock) = cache();
        cache.write_with_ttl("k", &1, Duration::from_millis(10)).await;
        assert!(cache.store().contains_key("@nely_cache:k").await);

        clock.advance(Duration::from_millis(11));
        assert_eq!(cache.read::<i32>("k").await, None);
        assert!(!cache.store().contains_key("@nely_cache:k").await);
    }

    #[tokio::test]
    async fn test_expired_record_of_other_shape_is_still_evicted() {
        let (cache, clock) = cache();
        cache.write_with_ttl("k", "text", Duration::from_millis(10)).await;

        clock.advance(Duration::from_millis(11));
        assert_eq!(cache.read::<u64>("k").await, None);
        assert!(!cache.store().contains_key("@nely_cache:k").await);
    }

    #[tokio::test]
    async fn test_fresh_record_of_other_shape_is_kept() {
        let (cache, _) = cache();
        cache.write_with_ttl("k", "text", durations::SHORT).await;

        assert_eq!(cache.read::<u64>("k").await, None);
        assert!(cache.store().contains_key("@nely_cache:k").await);
        assert_eq!(cache.read::<String>("k").await.as_deref(), Some("text"));
    }

    #[tokio::test]
    async fn test_entry_served_at_exact_expiry() {
        let (cache, clock) = cache();
        cache.write_with_ttl("k", "v", Duration::from_millis(10)).await;
        clock.advance(Duration::from_millis(10));
        assert_eq!(cache.read::<String>("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_default_write_uses_medium() {
        let (cache, clock) = cache();
        cache.write("k", &[1, 2, 3]).await;

        let entry = cache.read_entry::<Vec<i32>>("k").await.unwrap();
        assert_eq!(entry.expires_at - entry.timestamp, 300_000);

        clock.advance(durations::MEDIUM);
        assert!(cache.read::<Vec<i32>>("k").await.is_some());
        clock.advance(Duration::from_millis(1));
        assert!(cache.read::<Vec<i32>>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_never_written_is_absent() {
        let (cache, _) = cache();
        assert_eq!(cache.read::<String>("nothing_here").await, None);
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let (cache, _) = cache();
        cache.write_with_ttl("k", "v1", durations::LONG).await;
        cache.write_with_ttl("k", "v2", durations::LONG).await;
        assert_eq!(cache.read::<String>("k").await.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_remove_then_read() {
        let (cache, _) = cache();
        cache.write_with_ttl("k", "v", durations::VERY_LONG).await;
        cache.remove("k").await;
        assert_eq!(cache.read::<String>("k").await, None);

        // Absent key is a no-op
        cache.remove("k").await;
    }

    #[tokio::test]
    async fn test_clear_all_only_touches_namespace() {
        let (cache, _) = cache();
        cache.write("a", "1").await;
        cache.write("b", "2").await;
        cache
            .store()
            .set("supabase.auth.token", "secret".to_string())
            .await
            .unwrap();
        cache
            .store()
            .set("other:a", "unrelated".to_string())
            .await
            .unwrap();

        cache.clear_all().await;

        assert_eq!(cache.read::<String>("a").await, None);
        assert_eq!(cache.read::<String>("b").await, None);
        assert_eq!(cache.store().len().await, 2);
        assert_eq!(
            cache.store().get("supabase.auth.token").await.unwrap().as_deref(),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn test_families_do_not_cross_contaminate() {
        let (cache, _) = cache();
        let key_a = keys::elderly_profiles("familyA");
        let key_b = keys::elderly_profiles("familyB");
        cache.write(&key_a, &vec!["Mak Timah"]).await;
        cache.write(&key_b, &vec!["Atuk Ali", "Nenek Siti"]).await;

        assert_eq!(
            cache.read::<Vec<String>>(&key_a).await,
            Some(vec!["Mak Timah".to_string()])
        );
        assert_eq!(
            cache.read::<Vec<String>>(&key_b).await,
            Some(vec!["Atuk Ali".to_string(), "Nenek Siti".to_string()])
        );
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let (cache, _) = cache();
        cache
            .store()
            .set("@nely_cache:k", "{not json".to_string())
            .await
            .unwrap();
        assert_eq!(cache.read::<String>("k").await, None);

        // Wrong payload shape is also a miss
        cache.write("n", "text").await;
        assert_eq!(cache.read::<u64>("n").await, None);
    }

    #[tokio::test]
    async fn test_broken_store_never_errors() {
        let cache = Cache::new(BrokenStore);
        cache.write("k", "v").await;
        assert_eq!(cache.read::<String>("k").await, None);
        cache.remove("k").await;
        cache.clear_all().await;
        assert!(cache.keys().await.is_empty());
        assert_eq!(cache.stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_custom_namespaces_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let first = Cache::with_namespace(Arc::clone(&store), "@first:");
        let second = Cache::with_namespace(Arc::clone(&store), "@second:");

        first.write("k", "one").await;
        second.write("k", "two").await;
        first.clear_all().await;

        assert_eq!(first.read::<String>("k").await, None);
        assert_eq!(second.read::<String>("k").await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_keys_and_stats() {
        let (cache, clock) = cache();
        cache.write_with_ttl("b", &1, durations::SHORT).await;
        cache.write_with_ttl("a", &2, durations::LONG).await;
        cache.store().set("foreign", "x".to_string()).await.unwrap();

        assert_eq!(cache.keys().await, vec!["a".to_string(), "b".to_string()]);

        clock.advance(durations::SHORT + Duration::from_millis(1));
        assert_eq!(cache.stats().await, CacheStats { entries: 2, expired: 1 });
        // stats does not evict
        assert_eq!(cache.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let (cache, _) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let key = keys::medications("e1");

        for _ in 0..3 {
            let meds: Result<Vec<String>, String> = cache
                .read_through(&key, durations::MEDIUM, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["Metformin 500mg".to_string()])
                })
                .await;
            assert_eq!(meds.unwrap(), vec!["Metformin 500mg".to_string()]);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_through_error_is_not_cached() {
        let (cache, _) = cache();
        let key = keys::care_notes("e1");

        let failed: Result<Vec<String>, String> = cache
            .read_through(&key, durations::MEDIUM, || async { Err("network down".to_string()) })
            .await;
        assert_eq!(failed, Err("network down".to_string()));
        assert_eq!(cache.read::<Vec<String>>(&key).await, None);
    }

    #[tokio::test]
    async fn test_read_through_refetches_after_expiry() {
        let (cache, clock) = cache();
        let key = keys::upcoming_appointments("e1");
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move { Ok::<_, String>(calls.fetch_add(1, Ordering::SeqCst)) };

        assert_eq!(cache.read_through(&key, durations::SHORT, fetch).await, Ok(0));
        clock.advance(durations::SHORT + Duration::from_millis(1));
        assert_eq!(cache.read_through(&key, durations::SHORT, fetch).await, Ok(1));
    }

    #[tokio::test]
    async fn test_file_backed_cache_persists_and_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(1_700_000_000_000);
        let key = keys::vital_signs_history("elder42", "7d");

        let cache = Cache::new(FileStore::new(dir.path()).unwrap()).with_clock(clock.clone());
        cache.write_with_ttl(&key, &vec![118, 121], durations::LONG).await;
        drop(cache);

        let reopened = Cache::new(FileStore::new(dir.path()).unwrap()).with_clock(clock.clone());
        assert_eq!(reopened.read::<Vec<u32>>(&key).await, Some(vec![118, 121]));

        clock.advance(durations::LONG + Duration::from_millis(1));
        assert_eq!(reopened.read::<Vec<u32>>(&key).await, None);
        assert!(reopened.store().all_keys().await.unwrap().is_empty());
    }
}
