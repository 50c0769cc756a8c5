use criterion::{black_box, criterion_group, criterion_main, Criterion};
use review_cache::{keys, CacheConfig, CacheKind, KindCache};
use tokio::runtime::Runtime;

fn bench_hits(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = KindCache::new(CacheConfig::default());
    rt.block_on(cache.set(keys::all_courses(), vec![1u32; 64], CacheKind::Courses));

    c.bench_function("get_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let value: Vec<u32> = cache
                .get(
                    &keys::all_courses(),
                    || async { Ok::<_, anyhow::Error>(Vec::new()) },
                    CacheKind::Courses,
                )
                .await
                .unwrap();
            black_box(value)
        })
    });
}

fn bench_set_with_eviction(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = KindCache::new(CacheConfig::default());
    let mut i = 0u64;

    c.bench_function("set_evicting", |b| {
        b.to_async(&rt).iter(|| {
            i += 1;
            let key = keys::course_detail(&i.to_string());
            let cache = cache.clone();
            async move { cache.set(key, i, CacheKind::CourseDetail).await }
        })
    });
}

fn bench_coalesced_miss(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("coalesced_miss_x16", |b| {
        b.to_async(&rt).iter(|| async {
            let cache = KindCache::new(CacheConfig::default());
            let gets = (0..16).map(|_| {
                cache.get(
                    "stats:global",
                    || async { Ok::<_, anyhow::Error>(42u64) },
                    CacheKind::Stats,
                )
            });
            black_box(futures::future::join_all(gets).await)
        })
    });
}

criterion_group!(benches, bench_hits, bench_set_with_eviction, bench_coalesced_miss);
criterion_main!(benches);
