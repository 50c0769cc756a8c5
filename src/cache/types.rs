//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Cache key type - opaque string, conventionally `<kind>:<discriminator>`
pub type CacheKey = String;

/// Type-erased cached payload
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Statistics and metrics for cache monitoring
///
/// Diagnostic only; counters are best-effort snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries physically present
    pub total_size: usize,

    /// Entries that are currently valid
    pub valid_count: usize,

    /// Entries present but expired or version-mismatched
    pub expired_count: usize,

    /// Fraction of lookups served from cache (0.0 - 1.0)
    pub hit_rate_estimate: f64,

    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Values served from an expired entry because the producer failed
    pub stale_serves: u64,

    /// Background refreshes started
    pub background_refreshes: u64,

    /// Producer invocations that failed or panicked
    pub producer_failures: u64,

    /// Number of evictions due to per-kind size limits
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of explicit removals (delete, clear, clear by kind)
    pub invalidations: u64,

    /// Fetches in flight at snapshot time
    pub pending: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {} ({} valid, {} expired), stale_serves: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.total_size,
            self.valid_count,
            self.expired_count,
            self.stale_serves,
            self.total_evictions()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.miss_rate(), 20.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 100.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            total_size: 75,
            valid_count: 70,
            expired_count: 5,
            stale_serves: 2,
            evictions_size: 10,
            evictions_ttl: 5,
            ..Default::default()
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
        assert!(display.contains("70 valid"));
        assert!(display.contains("evictions: 15"));
    }
}
