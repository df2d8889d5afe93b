//! Informer lifecycle integration tests.

use informer_core::api::core::{ConfigMap, Pod};
use informer_core::downcast;
use nebucloud_informers::prelude::*;

fn factory(source: &Arc<MemorySource>) -> Arc<SharedInformerFactory> {
    Arc::new(
        SharedInformerFactory::builder()
            .source(Arc::clone(source) as Arc<dyn SourceProvider>)
            .default_resync(Duration::ZERO)
            .relist_backoff(Duration::from_millis(10))
            .shutdown_grace_period(Duration::from_secs(2))
            .build()
            .expect("factory should build"),
    )
}

fn pod(namespace: &str, name: &str) -> BoxObject {
    Arc::new(Pod::new(ObjectMeta::namespaced(namespace, name)))
}

async fn next_event(watch: &mut Watch) -> ObjectEvent {
    tokio::time::timeout(Duration::from_secs(5), watch.recv())
        .await
        .expect("event should arrive in time")
        .expect("watch should stay open")
}

#[tokio::test]
async fn handlers_follow_source_changes() {
    let source = Arc::new(MemorySource::new());
    source.insert(&Pod::resource_key(), pod("default", "a"));
    let factory = factory(&source);

    let informer = factory.informer_for::<Pod>().unwrap();
    let mut events = informer.add_event_handler();
    factory.start().unwrap();

    match next_event(&mut events).await {
        ObjectEvent::Added(obj) => assert_eq!(obj.name(), "a"),
        other => panic!("expected add, got {other:?}"),
    }

    source.insert(&Pod::resource_key(), pod("default", "b"));
    match next_event(&mut events).await {
        ObjectEvent::Added(obj) => assert_eq!(obj.name(), "b"),
        other => panic!("expected add, got {other:?}"),
    }

    source.insert(
        &Pod::resource_key(),
        Arc::new(Pod::new(
            ObjectMeta::namespaced("default", "a").with_label("tier", "front"),
        )),
    );
    match next_event(&mut events).await {
        ObjectEvent::Updated { old, new } => {
            assert!(old.meta().labels.is_empty());
            assert_eq!(new.meta().labels.get("tier").map(String::as_str), Some("front"));
        }
        other => panic!("expected update, got {other:?}"),
    }

    source.remove(&Pod::resource_key(), pod("default", "b"));
    match next_event(&mut events).await {
        ObjectEvent::Deleted(obj) => assert_eq!(obj.name(), "b"),
        other => panic!("expected delete, got {other:?}"),
    }

    assert_eq!(informer.indexer().len(), 1);
    assert!(factory.shutdown().await);
}

#[tokio::test]
async fn late_handler_gets_current_state() {
    let source = Arc::new(MemorySource::new());
    source.seed(
        &ConfigMap::resource_key(),
        [
            Arc::new(ConfigMap::new(ObjectMeta::namespaced("default", "one"))) as BoxObject,
            Arc::new(ConfigMap::new(ObjectMeta::namespaced("default", "two"))) as BoxObject,
        ],
    );
    let factory = factory(&source);
    let informer = factory.core().internal_version().config_maps().informer().unwrap();
    factory.start().unwrap();
    factory.wait_for_cache_sync(Duration::from_secs(5)).await;

    let mut watch = informer.add_event_handler();
    let mut names = Vec::new();
    for _ in 0..2 {
        match next_event(&mut watch).await {
            ObjectEvent::Added(obj) => names.push(obj.name().to_string()),
            other => panic!("expected add, got {other:?}"),
        }
    }
    names.sort();
    assert_eq!(names, vec!["one", "two"]);
    assert_eq!(informer.handler_count(), 1);

    factory.shutdown().await;
}

#[tokio::test]
async fn sync_state_and_resource_version() {
    let source = Arc::new(MemorySource::new());
    source.insert(&Pod::resource_key(), pod("default", "a"));
    let factory = factory(&source);

    let informer = factory.informer_for::<Pod>().unwrap();
    assert!(!informer.has_synced());
    assert!(informer.last_sync_resource_version().is_none());

    // Nothing started yet, so there is nothing to wait for.
    assert!(factory.wait_for_cache_sync(Duration::from_millis(50)).await.is_empty());

    factory.start().unwrap();
    let synced = factory.wait_for_cache_sync(Duration::from_secs(5)).await;
    assert_eq!(synced.get(&Pod::resource_key()), Some(&true));
    assert!(informer.is_started());
    assert!(informer.last_sync_resource_version().is_some());

    factory.shutdown().await;
}

#[tokio::test]
async fn typed_lister_downcasts() {
    let source = Arc::new(MemorySource::new());
    source.insert(&Pod::resource_key(), pod("prod", "api-0"));
    let factory = factory(&source);

    let pods = factory.core().internal_version().pods();
    let informer = pods.informer().unwrap();
    factory.start().unwrap();
    factory.wait_for_cache_sync(Duration::from_secs(5)).await;

    let lister = pods.lister().unwrap();
    let api = lister.by_namespace("prod").get("api-0").unwrap();
    assert_eq!(api.metadata.namespace.as_deref(), Some("prod"));

    let generic = informer.lister().get("prod/api-0").unwrap();
    let typed = downcast::<Pod>(&generic).expect("stored object should be a pod");
    assert!(Arc::ptr_eq(&typed, &api));

    factory.shutdown().await;
}

#[tokio::test]
async fn manual_feed_without_running() {
    let source = Arc::new(MemorySource::new());
    let factory = factory(&source);
    let informer = factory.informer_for::<Pod>().unwrap();

    informer.replace(vec![pod("default", "a"), pod("default", "b")], "10");
    assert!(informer.has_synced());
    assert_eq!(informer.last_sync_resource_version().as_deref(), Some("10"));

    informer.apply(WatchEvent::Deleted(pod("default", "a")));
    let remaining: Vec<_> = informer
        .lister()
        .list(&Selector::everything())
        .iter()
        .map(|o| o.name().to_string())
        .collect();
    assert_eq!(remaining, vec!["b"]);
}

#[tokio::test]
async fn shutdown_stops_running_informers() {
    let source = Arc::new(MemorySource::new());
    let factory = factory(&source);
    for key in [Pod::resource_key(), ConfigMap::resource_key()] {
        factory
            .informer_for_key(&key, |ctx| ctx.default_informer(&key))
            .unwrap();
    }
    assert_eq!(factory.start().unwrap(), 2);
    factory.wait_for_cache_sync(Duration::from_secs(5)).await;

    assert!(factory.shutdown().await);
    assert!(factory.is_shut_down());
    assert!(matches!(factory.start(), Err(InformerError::Stopped)));
}
