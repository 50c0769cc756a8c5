//! # Review Cache (review-cache)
//!
//! A kind-scoped, in-process cache for the read path of a course-review
//! service: course and instructor lists, detail pages, review lists and
//! aggregate statistics.
//!
//! ## Features
//!
//! - Per-kind TTL, refresh threshold, size bound and version tag
//! - Stale-while-revalidate background refresh
//! - Request coalescing for cold misses and refreshes alike
//! - Last-known-good fallback when a data source fails
//! - Periodic janitor sweep
//! - Async-first design using tokio
//!
//! ## Reading Through the Cache
//!
//! Data-access code hands the cache a producer; the producer only runs when
//! no valid entry exists (or, in the background, when the entry is aging).
//!
//! ```no_run
//! use review_cache::{keys, CacheConfig, CacheKind, KindCache};
//!
//! #[derive(Clone)]
//! struct Course {
//!     code: String,
//! }
//!
//! async fn fetch_course(code: String) -> anyhow::Result<Course> {
//!     Ok(Course { code })
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = KindCache::new(CacheConfig::from_env()?);
//!
//!     let course: Course = cache
//!         .get(
//!             &keys::course_detail("CS101"),
//!             || fetch_course("CS101".to_string()),
//!             CacheKind::CourseDetail,
//!         )
//!         .await?;
//!     println!("Loaded {}", course.code);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidating After Writes
//!
//! Writes bypass the cache and clear the affected kinds afterwards.
//!
//! ```no_run
//! use review_cache::{CacheConfig, CacheKind, KindCache};
//!
//! # async fn after_vote(cache: &KindCache) {
//! cache.clear_by_kind(CacheKind::Reviews).await;
//! cache.clear_by_kind(CacheKind::Stats).await;
//! # }
//! ```
//!
//! ## Janitor
//!
//! ```no_run
//! use review_cache::{start_janitor, CacheConfig, KindCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = KindCache::new(CacheConfig::default());
//!     let janitor = start_janitor(&cache);
//!     // ... serve requests ...
//!     janitor.stop();
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    keys, start_janitor, CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheKeyBuilder,
    CacheKind, CacheStats, CachedValue, EntryState, InvalidationReason, JanitorHandle, KindCache,
    KindConfig, KindTable, SweepReport,
};
pub use error::{CacheError, Result};
