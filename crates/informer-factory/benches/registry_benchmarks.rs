//! Benchmarks for informer lookup and cache reads.
//!
//! Run with: `cargo bench --package informer-factory`
//!
//! These benchmarks measure:
//! - Registry lookups for hits, misses and cold construction
//! - Lister reads over a populated cache
//! - Mixed lookup traffic across many resource types

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use informer_cache::{MemorySource, Selector, Store};
use informer_core::api::core::Pod;
use informer_core::{BoxObject, ObjectMeta, Resource, ResourceKey};
use informer_factory::{GenericInformer, InformerRegistry, SharedInformerFactory};

fn factory() -> Arc<SharedInformerFactory> {
    Arc::new(
        SharedInformerFactory::builder()
            .source(Arc::new(MemorySource::new()))
            .default_resync(Duration::ZERO)
            .build()
            .expect("factory"),
    )
}

fn registry() -> InformerRegistry {
    InformerRegistry::with_builtin_types(factory()).expect("registry")
}

/// Benchmark lookups of an informer that already exists.
fn bench_lookup_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_hit");
    let registry = registry();
    let pods = ResourceKey::new("", "internal", "pods");
    registry.lookup(&pods).expect("warm up");

    group.bench_function("pods", |b| {
        b.iter(|| black_box(registry.lookup(&pods)));
    });

    group.finish();
}

/// Benchmark lookups of unregistered keys.
fn bench_lookup_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_miss");
    let registry = registry();
    let widgets = ResourceKey::new("example.com", "v1", "widgets");

    group.bench_function("widgets", |b| {
        b.iter(|| black_box(registry.lookup(&widgets).is_err()));
    });

    group.finish();
}

/// Benchmark the first lookup of every built-in type.
fn bench_lookup_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_cold");

    group.bench_function("all_builtin", |b| {
        b.iter_with_setup(
            || {
                let registry = registry();
                let keys = registry.keys();
                (registry, keys)
            },
            |(registry, keys)| {
                for key in &keys {
                    black_box(registry.lookup(key).expect("lookup"));
                }
            },
        );
    });

    group.finish();
}

/// Benchmark listing a populated cache through a generic handle.
fn bench_lister_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("lister_list");

    for num_objects in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*num_objects as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_objects),
            num_objects,
            |b, &num_objects| {
                let registry = registry();
                let handle = registry.lookup(&Pod::resource_key()).expect("lookup");
                let indexer = handle.informer().indexer();
                for i in 0..num_objects {
                    let meta = ObjectMeta::namespaced(format!("ns-{}", i % 10), format!("pod-{}", i))
                        .with_label("app", if i % 2 == 0 { "web" } else { "db" });
                    indexer.upsert(Arc::new(Pod::new(meta)) as BoxObject);
                }
                let lister = handle.lister();
                let selector = Selector::parse("app=web").expect("selector");

                b.iter(|| black_box(lister.list(&selector)));
            },
        );
    }

    group.finish();
}

/// Benchmark lookups spread across all built-in keys.
fn bench_mixed_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_lookups");

    group.bench_function("round_robin", |b| {
        let registry = registry();
        let keys = registry.keys();
        let mut counter = 0usize;
        b.iter(|| {
            counter += 1;
            black_box(registry.lookup(&keys[counter % keys.len()]))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_lookup_hit,
    bench_lookup_miss,
    bench_lookup_cold,
    bench_lister_list,
    bench_mixed_lookups,
);

criterion_main!(benches);
