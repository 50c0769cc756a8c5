//! Cache entry management with TTL support

use crate::cache::kind::{CacheKind, KindConfig, MAX_TTL};
use crate::cache::types::CachedValue;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle state of a physically present entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Within its TTL and below the refresh threshold
    Valid,

    /// Still served to readers, but old enough to warrant a background refresh
    StaleButServeable,

    /// Past its TTL or written under another kind version; logically absent
    Expired,
}

impl EntryState {
    /// Whether readers may be handed this entry's value
    pub fn is_serveable(&self) -> bool {
        !matches!(self, EntryState::Expired)
    }
}

/// A cached, type-erased value with its lifetime metadata
#[derive(Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: CachedValue,

    /// Kind the entry was written under
    pub kind: CacheKind,

    /// When the entry was written or last refreshed
    pub stored_at: Instant,

    /// When the entry stops being valid
    pub expires_at: Instant,

    /// Wall-clock write time, for diagnostics
    pub stored_at_wall: DateTime<Utc>,

    /// Kind version active when the entry was written
    pub kind_version: String,

    /// Monotonic write order within the store
    pub write_seq: u64,
}

impl CacheEntry {
    /// Create an entry written now under `config`
    pub fn new(value: CachedValue, kind: CacheKind, config: &KindConfig, write_seq: u64) -> Self {
        Self::written_at(value, kind, config, write_seq, Instant::now())
    }

    /// Create an entry as if written at `stored_at`
    pub fn written_at(
        value: CachedValue,
        kind: CacheKind,
        config: &KindConfig,
        write_seq: u64,
        stored_at: Instant,
    ) -> Self {
        Self {
            value,
            kind,
            stored_at,
            expires_at: expiry_after(stored_at, config.ttl_with_jitter()),
            stored_at_wall: Utc::now(),
            kind_version: config.version.clone(),
            write_seq,
        }
    }

    /// Check if the entry has expired by time
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Whether the entry was written under the current kind version
    pub fn matches_version(&self, config: &KindConfig) -> bool {
        self.kind_version == config.version
    }

    /// Valid iff not expired and written under the current version
    pub fn is_valid_at(&self, now: Instant, config: &KindConfig) -> bool {
        !self.is_expired_at(now) && self.matches_version(config)
    }

    /// Lifetime this entry was given on write
    pub fn ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(self.stored_at)
    }

    /// Get the age of the entry
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    /// Classify the entry against the current kind policy
    pub fn state_at(&self, now: Instant, config: &KindConfig) -> EntryState {
        if !self.is_valid_at(now, config) {
            return EntryState::Expired;
        }

        if config.wants_refresh(self.age_at(now), self.ttl()) {
            EntryState::StaleButServeable
        } else {
            EntryState::Valid
        }
    }

    /// Share the type-erased payload
    pub fn shared_value(&self) -> CachedValue {
        Arc::clone(&self.value)
    }
}

/// `stored_at + ttl`, clamped to the longest lifetime an entry may have
fn expiry_after(stored_at: Instant, ttl: Duration) -> Instant {
    stored_at
        .checked_add(ttl.min(MAX_TTL))
        .unwrap_or(stored_at)
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("kind", &self.kind)
            .field("stored_at", &self.stored_at)
            .field("expires_at", &self.expires_at)
            .field("kind_version", &self.kind_version)
            .field("write_seq", &self.write_seq)
            .finish_non_exhaustive()
    }
}
