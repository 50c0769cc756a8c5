//! Periodic sweep of expired entries
//!
//! Reads already treat expired entries as absent; the janitor bounds memory
//! for keys that are never read again.

use crate::cache::store::KindCache;
use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Result of one sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Keys that were removed
    pub removed: Vec<CacheKey>,

    /// When the sweep ran
    pub swept_at: DateTime<Utc>,
}

impl SweepReport {
    pub fn new(removed: Vec<CacheKey>) -> Self {
        Self {
            removed,
            swept_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Handle to the background sweep task
///
/// Dropping the handle stops the sweep.
#[derive(Debug)]
pub struct JanitorHandle {
    task: Option<JoinHandle<()>>,
}

impl JanitorHandle {
    /// Whether a sweep task was started and has not finished
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the sweep task
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for JanitorHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Background task for automatic cache cleanup
///
/// Sweeps every `janitor_interval`. The task holds only a weak reference and
/// ends on its own once every handle to the cache is dropped.
pub fn start_janitor(cache: &KindCache) -> JanitorHandle {
    let config = cache.config();
    if !config.enable_janitor {
        info!("Cache janitor disabled");
        return JanitorHandle { task: None };
    }

    let interval = config.janitor_interval;
    let weak = cache.downgrade();

    info!("Starting cache janitor (interval: {:?})", interval);

    let task = tokio::spawn(async move {
        let now = Instant::now();
        let mut ticker = time::interval_at(now.checked_add(interval).unwrap_or(now), interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(inner) = weak.upgrade() else {
                debug!("Cache dropped, janitor exiting");
                break;
            };

            let report = KindCache::from_inner(inner).cleanup_expired().await;
            if !report.is_empty() {
                debug!("Janitor removed {} expired entries", report.len());
            }
        }
    });

    JanitorHandle { task: Some(task) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::kind::{CacheKind, KindConfig};
    use std::time::Duration;

    fn cache_with_janitor(interval: Duration, enabled: bool) -> KindCache {
        KindCache::new(
            CacheConfig::builder()
                .janitor_interval(interval)
                .enable_janitor(enabled)
                .kind(CacheKind::Stats, KindConfig::new(Duration::from_secs(5)))
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_sweeps_without_reads() {
        let cache = cache_with_janitor(Duration::from_secs(10), true);
        let janitor = start_janitor(&cache);
        assert!(janitor.is_running());

        cache.set("stats:global", 1u32, CacheKind::Stats).await;
        cache.set("courses:all", 2u32, CacheKind::Courses).await;

        time::sleep(Duration::from_secs(11)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.stats().await.evictions_ttl, 1);

        janitor.stop();
    }

    #[tokio::test]
    async fn test_disabled_janitor_does_not_spawn() {
        let cache = cache_with_janitor(Duration::from_secs(10), false);
        let janitor = start_janitor(&cache);
        assert!(!janitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_exits_when_cache_dropped() {
        let cache = cache_with_janitor(Duration::from_secs(1), true);
        let janitor = start_janitor(&cache);
        drop(cache);

        time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert!(!janitor.is_running());
    }

    #[test]
    fn test_sweep_report() {
        let report = SweepReport::new(vec!["stats:a".to_string()]);
        assert_eq!(report.len(), 1);
        assert!(!report.is_empty());
        assert!(SweepReport::new(Vec::new()).is_empty());
    }
}
