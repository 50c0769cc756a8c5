//! Fetch coordination: one producer run per key at a time
//!
//! A fetch runs in its own spawned task, so a caller that stops awaiting never
//! cancels it. Every caller that arrives while the fetch is pending joins the
//! same shared outcome.

use crate::cache::kind::CacheKind;
use crate::cache::store::{CacheInner, CacheStore};
use crate::cache::types::{CacheKey, CachedValue};
use crate::error::{CacheError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::error::Error as StdError;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome shared by every caller of one fetch
pub(crate) type FetchOutcome = Result<CachedValue>;

/// Handle to an in-flight fetch
pub(crate) type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Why a fetch was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOrigin {
    /// No valid entry was present
    Miss,
    /// A hit aged past the refresh threshold
    Background,
    /// A caller asked to bypass the cached value
    Forced,
}

impl std::fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOrigin::Miss => write!(f, "miss"),
            FetchOrigin::Background => write!(f, "background refresh"),
            FetchOrigin::Forced => write!(f, "forced refresh"),
        }
    }
}

/// Join the pending fetch for `key`, or start one running `producer`
///
/// Must be called with the store lock held so that checking and registering
/// the pending fetch is a single step.
pub(crate) fn join_or_start<T, F, Fut, E>(
    inner: &Arc<CacheInner>,
    store: &mut CacheStore,
    key: &str,
    kind: CacheKind,
    origin: FetchOrigin,
    producer: F,
) -> PendingFetch
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
{
    if let Some(pending) = store.pending.get(key) {
        debug!("Joining in-flight fetch ({}): {}", origin, key);
        return pending.clone();
    }

    debug!("Starting fetch ({}): {}", origin, key);
    let task = tokio::spawn(run_fetch(
        Arc::clone(inner),
        key.to_string(),
        kind,
        origin,
        producer,
    ));

    let task_key = key.to_string();
    let pending = async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!("Fetch task for {} did not complete: {}", task_key, join_error);
                Err(CacheError::ProducerPanicked { key: task_key })
            }
        }
    }
    .boxed()
    .shared();

    store.pending.insert(key.to_string(), pending.clone());
    pending
}

/// Run the producer, store its value, and settle the pending fetch
///
/// The pending slot is released on every path, including a panic while the
/// result is being stored.
async fn run_fetch<T, F, Fut, E>(
    inner: Arc<CacheInner>,
    key: CacheKey,
    kind: CacheKind,
    origin: FetchOrigin,
    producer: F,
) -> FetchOutcome
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
{
    let produced = AssertUnwindSafe(async move { producer().await })
        .catch_unwind()
        .await;

    let settled = AssertUnwindSafe(settle(&inner, &key, kind, origin, produced))
        .catch_unwind()
        .await;

    match settled {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("Fetch ({}) for {} panicked while storing its result", origin, key);
            inner.store.write().await.pending.remove(&key);
            Err(CacheError::ProducerPanicked { key })
        }
    }
}

/// Store or fall back on the producer's result, then drop the pending slot
async fn settle<T, E>(
    inner: &CacheInner,
    key: &str,
    kind: CacheKind,
    origin: FetchOrigin,
    produced: std::thread::Result<std::result::Result<T, E>>,
) -> FetchOutcome
where
    T: Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let mut store = inner.store.write().await;

    let outcome = match produced {
        Ok(Ok(value)) => {
            let value: CachedValue = Arc::new(value);
            store.insert(inner.config.kind(kind), key.to_string(), Arc::clone(&value), kind);
            debug!("Fetch ({}) stored: {}", origin, key);
            Ok(value)
        }
        Ok(Err(e)) => {
            let error = CacheError::producer(key, e);
            serve_stale_or(inner, &mut store, key, kind, origin, error)
        }
        Err(_) => {
            let error = CacheError::ProducerPanicked { key: key.to_string() };
            serve_stale_or(inner, &mut store, key, kind, origin, error)
        }
    };

    // Written before the pending fetch goes away: a caller always finds one of the two.
    store.pending.remove(key);
    outcome
}

/// Fall back to any physically present entry of the same kind and version
///
/// The entry keeps its `expires_at`; it stays logically expired for every
/// other reader.
fn serve_stale_or(
    inner: &CacheInner,
    store: &mut CacheStore,
    key: &str,
    kind: CacheKind,
    origin: FetchOrigin,
    error: CacheError,
) -> FetchOutcome {
    store.stats.producer_failures += 1;

    let config = inner.config.kind(kind);
    let stale = store
        .entries
        .get(key)
        .filter(|entry| entry.kind == kind && entry.matches_version(config))
        .map(|entry| entry.shared_value());

    match stale {
        Some(value) => {
            store.stats.stale_serves += 1;
            warn!("Serving stale value for {} after failed {}: {}", key, origin, error);
            Ok(value)
        }
        None => {
            warn!("Fetch ({}) failed for {} with no fallback: {}", origin, key, error);
            Err(error)
        }
    }
}
