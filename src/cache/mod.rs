//! # Kind-Scoped Caching Layer
//!
//! An in-process cache in front of read-heavy backend queries. Entries are
//! grouped into kinds (course lists, detail pages, reviews, stats), and each
//! kind carries its own policy.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: entries are treated as absent once their TTL runs out
//! - **Stale-While-Revalidate**: aging hits return immediately while a refresh runs in the background
//! - **Request Coalescing**: concurrent fetches of one key share a single producer run
//! - **Stale Fallback**: a failed fetch serves the last known value when one is still present
//! - **Per-Kind Size Bounds**: the oldest-written entries of a kind are evicted first
//! - **Version Tags**: bumping a kind's version invalidates all its entries
//! - **Janitor**: a periodic sweep removes expired entries independent of reads
//!
//! ## Example
//!
//! ```rust
//! use review_cache::cache::{keys, CacheConfig, CacheKind, KindCache};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = KindCache::new(CacheConfig::default());
//!
//! let courses: Vec<String> = cache
//!     .get(&keys::all_courses(), || async {
//!         Ok::<_, anyhow::Error>(vec!["CS101".to_string()])
//!     }, CacheKind::Courses)
//!     .await?;
//! assert_eq!(courses, vec!["CS101".to_string()]);
//!
//! // After a write to the underlying data
//! cache.clear_by_kind(CacheKind::Courses).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub(crate) mod coordinator;
pub mod entry;
pub mod invalidation;
pub mod janitor;
pub mod keys;
pub mod kind;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, EntryState};
pub use invalidation::InvalidationReason;
pub use janitor::{start_janitor, JanitorHandle, SweepReport};
pub use keys::CacheKeyBuilder;
pub use kind::{CacheKind, KindConfig, KindTable, MAX_TTL};
pub use store::KindCache;
pub use types::{CacheKey, CacheStats, CachedValue};
