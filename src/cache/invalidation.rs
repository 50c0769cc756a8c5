//! Reasons an entry leaves the store

use serde::{Deserialize, Serialize};

/// Reason for removing a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entry expired based on TTL
    Expired,

    /// Entry was written under an older kind version
    VersionChanged,

    /// Evicted to respect the kind's entry limit
    SizeLimit,

    /// Manual invalidation by key
    Manual,

    /// Every entry of the kind was invalidated after a write
    KindCleared,

    /// The whole cache was cleared
    Cleared,
}

impl InvalidationReason {
    /// Whether the removal was requested by a caller rather than by policy
    pub fn is_explicit(&self) -> bool {
        matches!(
            self,
            InvalidationReason::Manual | InvalidationReason::KindCleared | InvalidationReason::Cleared
        )
    }
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "TTL expired"),
            InvalidationReason::VersionChanged => write!(f, "kind version changed"),
            InvalidationReason::SizeLimit => write!(f, "kind size limit reached"),
            InvalidationReason::Manual => write!(f, "manual invalidation"),
            InvalidationReason::KindCleared => write!(f, "kind cleared"),
            InvalidationReason::Cleared => write!(f, "cache cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_reason_display() {
        assert_eq!(InvalidationReason::Expired.to_string(), "TTL expired");
        assert_eq!(InvalidationReason::SizeLimit.to_string(), "kind size limit reached");
    }

    #[test]
    fn test_explicit_reasons() {
        assert!(InvalidationReason::Cleared.is_explicit());
        assert!(InvalidationReason::Manual.is_explicit());
        assert!(InvalidationReason::KindCleared.is_explicit());
        assert!(!InvalidationReason::Expired.is_explicit());
        assert!(!InvalidationReason::SizeLimit.is_explicit());
    }
}
