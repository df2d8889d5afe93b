//! Load tests for registry lookups and informer caches.
//!
//! These tests verify the system holds up under load:
//! - many concurrent lookups racing on first construction
//! - thousands of objects flowing through one informer
//! - readers listing while the source keeps changing
//!
//! Run with: `cargo test --package integration-tests --test load_tests -- --nocapture`

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use informer_core::api::core::Pod;
use nebucloud_informers::prelude::*;
use tokio::sync::Barrier;

fn setup() -> (Arc<MemorySource>, Arc<SharedInformerFactory>, Arc<InformerRegistry>) {
    let source = Arc::new(MemorySource::with_history(16_384));
    let factory = Arc::new(
        SharedInformerFactory::builder()
            .source(Arc::clone(&source) as Arc<dyn SourceProvider>)
            .default_resync(Duration::ZERO)
            .relist_backoff(Duration::from_millis(10))
            .build()
            .expect("factory should build"),
    );
    let registry = Arc::new(
        InformerRegistry::with_builtin_types(Arc::clone(&factory)).expect("registry should build"),
    );
    (source, factory, registry)
}

/// Many tasks resolve every built-in key at the same moment.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_all_types() {
    let (_, factory, registry) = setup();
    let keys = Arc::new(registry.keys());
    let num_tasks = 32;

    let barrier = Arc::new(Barrier::new(num_tasks));
    let total_ops = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for task_id in 0..num_tasks {
        let registry = Arc::clone(&registry);
        let keys = Arc::clone(&keys);
        let barrier = Arc::clone(&barrier);
        let total_ops = Arc::clone(&total_ops);

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            for i in 0..100 {
                let key = &keys[(task_id + i) % keys.len()];
                registry.lookup(key).expect("lookup should succeed");
                total_ops.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    let duration = start.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    println!(
        "Concurrent lookup: {} ops in {:?} ({:.2} µs/op)",
        ops,
        duration,
        duration.as_micros() as f64 / ops as f64
    );

    assert_eq!(ops, (num_tasks * 100) as u64);
    assert_eq!(factory.construction_count(), keys.len() as u64);
}

/// One informer mirrors 5000 objects.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_5000_objects() {
    let (source, factory, registry) = setup();
    let num_objects = 5000;

    source.seed(
        &Pod::resource_key(),
        (0..num_objects).map(|i| {
            Arc::new(Pod::new(
                ObjectMeta::namespaced(format!("ns-{}", i % 50), format!("pod-{}", i))
                    .with_label("shard", (i % 4).to_string()),
            )) as BoxObject
        }),
    );

    let handle = registry.lookup(&Pod::resource_key()).unwrap();
    let start = Instant::now();
    factory.start().unwrap();
    let synced = factory.wait_for_cache_sync(Duration::from_secs(30)).await;
    println!("Synced {} objects in {:?}", num_objects, start.elapsed());
    assert_eq!(synced.get(&Pod::resource_key()), Some(&true));

    let lister = handle.lister();
    assert_eq!(lister.list(&Selector::everything()).len(), num_objects);
    assert_eq!(
        lister.list(&Selector::parse("shard=0").unwrap()).len(),
        num_objects / 4
    );
    assert_eq!(
        lister.by_namespace("ns-7").list(&Selector::everything()).len(),
        num_objects / 50
    );

    factory.shutdown().await;
}

/// Readers keep listing while a writer streams updates into the source.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writer() {
    let (source, factory, registry) = setup();
    let handle = registry.lookup(&Pod::resource_key()).unwrap();
    factory.start().unwrap();
    factory.wait_for_cache_sync(Duration::from_secs(5)).await;

    let num_writes = 2000;
    let writer = {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            for i in 0..num_writes {
                source.insert(
                    &Pod::resource_key(),
                    Arc::new(Pod::new(ObjectMeta::namespaced("load", format!("pod-{}", i % 500)))),
                );
                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let reads = Arc::new(AtomicU64::new(0));
    let mut readers = Vec::new();
    for _ in 0..4 {
        let lister = handle.lister();
        let reads = Arc::clone(&reads);
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let listed = lister.list(&Selector::everything());
                assert!(listed.len() <= 500);
                reads.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.expect("writer panicked");
    for reader in readers {
        reader.await.expect("reader panicked");
    }

    let informer = handle.informer();
    let deadline = Instant::now() + Duration::from_secs(10);
    while informer.indexer().len() < 500 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(informer.indexer().len(), 500);
    assert_eq!(reads.load(Ordering::Relaxed), 800);

    factory.shutdown().await;
}
