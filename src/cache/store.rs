//! Main cache store with per-kind size bounds and stale-while-revalidate reads

use crate::cache::{
    config::CacheConfig,
    coordinator::{self, FetchOrigin, PendingFetch},
    entry::{CacheEntry, EntryState},
    invalidation::InvalidationReason,
    janitor::SweepReport,
    kind::{CacheKind, KindConfig},
    types::{CacheKey, CacheStats, CachedValue},
};
use crate::error::{CacheError, Result};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Kind-scoped cache in front of asynchronous data sources
///
/// This implementation provides:
/// - Thread-safe async access via RwLock
/// - TTL expiry and kind version checks on every read
/// - Background refresh of aging entries without blocking the caller
/// - At most one producer run per key at any time
/// - Per-kind eviction of the oldest-written entries
///
/// Cloning is cheap and every clone shares the same store.
#[derive(Clone)]
pub struct KindCache {
    inner: Arc<CacheInner>,
}

pub(crate) struct CacheInner {
    /// Cache configuration
    pub(crate) config: CacheConfig,

    /// Internal storage
    pub(crate) store: RwLock<CacheStore>,
}

/// Internal cache storage
pub(crate) struct CacheStore {
    /// Main storage: key -> entry
    pub(crate) entries: HashMap<CacheKey, CacheEntry>,

    /// In-flight fetches: key -> shared outcome
    pub(crate) pending: HashMap<CacheKey, PendingFetch>,

    /// Running counters; snapshot fields are filled in by `stats()`
    pub(crate) stats: CacheStats,

    /// Sequence number for the next write
    next_seq: u64,
}

impl CacheStore {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashMap::new(),
            stats: CacheStats::default(),
            next_seq: 0,
        }
    }

    /// Write an entry, making room within its kind first
    pub(crate) fn insert(
        &mut self,
        config: &KindConfig,
        key: CacheKey,
        value: CachedValue,
        kind: CacheKind,
    ) {
        if !self.entries.contains_key(&key) {
            self.evict_for(kind, config);
        }

        self.next_seq += 1;
        let entry = CacheEntry::new(value, kind, config, self.next_seq);
        debug!("Storing cache entry: {} (expires in {:?})", key, entry.ttl());
        self.entries.insert(key, entry);
    }

    /// Internal: Make room for one more entry of `kind`
    ///
    /// Expired and version-mismatched entries of the kind go first; if the
    /// kind is still full, the oldest-written live entries are evicted.
    fn evict_for(&mut self, kind: CacheKind, config: &KindConfig) {
        let max_entries = config.max_entries;
        if self.kind_count(kind) < max_entries {
            return;
        }

        let now = Instant::now();
        let dead: Vec<(CacheKey, InvalidationReason)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind && !entry.is_valid_at(now, config))
            .map(|(key, entry)| {
                let reason = if entry.matches_version(config) {
                    InvalidationReason::Expired
                } else {
                    InvalidationReason::VersionChanged
                };
                (key.clone(), reason)
            })
            .collect();
        for (key, reason) in dead {
            self.remove_entry(&key, reason);
        }

        let mut live: Vec<(Instant, u64, CacheKey)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(key, entry)| (entry.stored_at, entry.write_seq, key.clone()))
            .collect();

        if live.len() < max_entries {
            return;
        }

        live.sort();
        let excess = live.len() + 1 - max_entries;
        for (_, _, key) in live.into_iter().take(excess) {
            self.remove_entry(&key, InvalidationReason::SizeLimit);
        }
    }

    fn kind_count(&self, kind: CacheKind) -> usize {
        self.entries.values().filter(|entry| entry.kind == kind).count()
    }

    /// Internal: Remove an entry and account for why
    pub(crate) fn remove_entry(&mut self, key: &str, reason: InvalidationReason) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;

        match reason {
            reason if reason.is_explicit() => self.stats.invalidations += 1,
            InvalidationReason::SizeLimit => self.stats.evictions_size += 1,
            _ => self.stats.evictions_ttl += 1,
        }

        debug!("Removed cache entry ({}): {}", reason, key);
        Some(entry)
    }
}

impl KindCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!("Initializing kind cache with config: {:?}", config);

        Self {
            inner: Arc::new(CacheInner {
                config,
                store: RwLock::new(CacheStore::new()),
            }),
        }
    }

    /// Create a cache after validating the configuration
    pub fn try_new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<CacheInner>) -> Self {
        Self { inner }
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get a value, fetching it with `producer` when no valid entry exists
    ///
    /// A valid hit is returned immediately. When the hit has aged past its
    /// kind's refresh threshold a background refresh is started first and
    /// not awaited. Concurrent misses for the same key share one producer run.
    pub async fn get<T, F, Fut, E>(&self, key: &str, producer: F, kind: CacheKind) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let pending = {
            let mut store = self.inner.store.write().await;
            let now = Instant::now();

            let hit = store.entries.get(key).and_then(|entry| {
                let state = entry.state_at(now, self.inner.config.kind(entry.kind));
                state
                    .is_serveable()
                    .then(|| (state, entry.shared_value()))
            });

            if let Some((state, value)) = hit {
                let value = downcast_value::<T>(key, &value)?;
                store.stats.hits += 1;
                debug!("Cache hit: {}", key);

                if state == EntryState::StaleButServeable && !store.pending.contains_key(key) {
                    store.stats.background_refreshes += 1;
                    // Detached: the outcome is settled and logged inside the fetch task.
                    let _ = coordinator::join_or_start(
                        &self.inner,
                        &mut store,
                        key,
                        kind,
                        FetchOrigin::Background,
                        producer,
                    );
                }

                return Ok(value);
            }

            store.stats.misses += 1;
            debug!("Cache miss: {}", key);
            coordinator::join_or_start(&self.inner, &mut store, key, kind, FetchOrigin::Miss, producer)
        };

        let value = pending.await?;
        downcast_value::<T>(key, &value)
    }

    /// Fetch a fresh value even if a valid one is cached
    ///
    /// Still joins a fetch that is already in flight for the key.
    pub async fn refresh<T, F, Fut, E>(&self, key: &str, producer: F, kind: CacheKind) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let pending = {
            let mut store = self.inner.store.write().await;
            coordinator::join_or_start(&self.inner, &mut store, key, kind, FetchOrigin::Forced, producer)
        };

        let value = pending.await?;
        downcast_value::<T>(key, &value)
    }

    /// Write a value unconditionally
    pub async fn set<T>(&self, key: impl Into<CacheKey>, value: T, kind: CacheKind)
    where
        T: Send + Sync + 'static,
    {
        let mut store = self.inner.store.write().await;
        store.insert(self.inner.config.kind(kind), key.into(), Arc::new(value), kind);
    }

    /// Remove a specific entry; returns whether one existed
    pub async fn delete(&self, key: &str) -> bool {
        let mut store = self.inner.store.write().await;
        store.remove_entry(key, InvalidationReason::Manual).is_some()
    }

    /// Clear all entries from the cache
    ///
    /// In-flight fetches are not cancelled; their results land in the
    /// emptied store.
    pub async fn clear(&self) {
        let mut store = self.inner.store.write().await;

        let keys: Vec<CacheKey> = store.entries.keys().cloned().collect();
        for key in &keys {
            store.remove_entry(key, InvalidationReason::Cleared);
        }
        let count = keys.len();

        info!("Cleared {} entries from cache", count);
    }

    /// Remove every entry of one kind; returns how many were removed
    ///
    /// This is the invalidation hook for writes to the underlying data.
    pub async fn clear_by_kind(&self, kind: CacheKind) -> usize {
        let mut store = self.inner.store.write().await;

        let keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            store.remove_entry(key, InvalidationReason::KindCleared);
        }

        info!("Invalidated {} entries of kind {}", keys.len(), kind);
        keys.len()
    }

    /// Whether a valid entry exists, without fetching
    ///
    /// An expired or version-mismatched entry is removed as a side effect.
    pub async fn has(&self, key: &str) -> bool {
        let mut store = self.inner.store.write().await;
        let now = Instant::now();

        let Some(entry) = store.entries.get(key) else {
            return false;
        };

        let config = self.inner.config.kind(entry.kind);
        if entry.is_valid_at(now, config) {
            return true;
        }

        let reason = if entry.matches_version(config) {
            InvalidationReason::Expired
        } else {
            InvalidationReason::VersionChanged
        };
        store.remove_entry(key, reason);
        false
    }

    /// Remove every entry whose TTL has run out
    pub async fn cleanup_expired(&self) -> SweepReport {
        let mut store = self.inner.store.write().await;
        let now = Instant::now();

        let expired: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.remove_entry(key, InvalidationReason::Expired);
        }

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }

        SweepReport::new(expired)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.store.read().await;
        let now = Instant::now();

        let valid_count = store
            .entries
            .values()
            .filter(|entry| entry.is_valid_at(now, self.inner.config.kind(entry.kind)))
            .count();

        let mut stats = store.stats.clone();
        stats.total_size = store.entries.len();
        stats.valid_count = valid_count;
        stats.expired_count = stats.total_size - valid_count;
        stats.hit_rate_estimate = stats.hit_rate() / 100.0;
        stats.pending = store.pending.len();
        stats
    }

    /// Get number of entries physically present
    pub async fn len(&self) -> usize {
        let store = self.inner.store.read().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.inner.store.read().await;
        store.entries.is_empty()
    }

    /// Number of entries physically present for one kind
    pub async fn kind_len(&self, kind: CacheKind) -> usize {
        let store = self.inner.store.read().await;
        store.kind_count(kind)
    }

    /// Whether a fetch for `key` is in flight
    pub async fn is_pending(&self, key: &str) -> bool {
        let store = self.inner.store.read().await;
        store.pending.contains_key(key)
    }
}

impl std::fmt::Debug for KindCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn downcast_value<T: Clone + 'static>(key: &str, value: &CachedValue) -> Result<T> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CacheError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
