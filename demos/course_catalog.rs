//! Course catalog demo
//!
//! Simulates the read path of a course-review service: a slow, occasionally
//! failing backend behind the kind cache.
//!
//! Run with:
//! ```text
//! RUST_LOG=review_cache=debug cargo run --example course_catalog
//! ```

use anyhow::Result;
use review_cache::{keys, start_janitor, CacheConfig, CacheKind, KindCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Course {
    code: String,
    title: String,
}

/// Stand-in for the hosted backend
#[derive(Clone, Default)]
struct Backend {
    calls: Arc<AtomicUsize>,
}

impl Backend {
    async fn list_courses(self) -> Result<Vec<Course>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(200)).await;

        if call % 3 == 0 {
            anyhow::bail!("backend timed out on call {}", call);
        }

        Ok(vec![
            Course {
                code: "CS101".to_string(),
                title: format!("Intro to Programming (rev {})", call),
            },
            Course {
                code: "MATH200".to_string(),
                title: "Linear Algebra".to_string(),
            },
        ])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CacheConfig::from_env()?;
    let cache = KindCache::new(config);
    let janitor = start_janitor(&cache);
    let backend = Backend::default();

    info!("Ten concurrent page loads on a cold cache");
    let courses_key = keys::all_courses();
    let loads = (0..10).map(|_| {
        let backend = backend.clone();
        cache.get(
            &courses_key,
            move || backend.list_courses(),
            CacheKind::Courses,
        )
    });
    for courses in futures::future::join_all(loads).await {
        let courses: Vec<Course> = courses?;
        info!("Page rendered with {} courses", courses.len());
    }
    info!("Backend calls so far: {}", backend.calls.load(Ordering::SeqCst));

    for _ in 0..4 {
        let backend = backend.clone();
        let courses: Vec<Course> = cache
            .refresh(
                &courses_key,
                move || backend.list_courses(),
                CacheKind::Courses,
            )
            .await?;
        info!("Refreshed: {}", courses[0].title);
    }

    info!("A review was posted; invalidating reviews and stats");
    cache.clear_by_kind(CacheKind::Reviews).await;
    cache.clear_by_kind(CacheKind::Stats).await;

    let detail = cache
        .get(
            &keys::course_detail("CS101"),
            || async {
                Ok::<_, anyhow::Error>(Course {
                    code: "CS101".to_string(),
                    title: "Intro to Programming".to_string(),
                })
            },
            CacheKind::CourseDetail,
        )
        .await?;
    info!("Detail page for {}: {}", detail.code, detail.title);

    info!("{}", cache.stats().await);
    janitor.stop();
    Ok(())
}
