//! Registry integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use informer_core::api::{apps, core as core_api, rbac};
use informer_factory::InformerProvider;
use nebucloud_informers::prelude::*;

fn setup() -> (Arc<MemorySource>, Arc<SharedInformerFactory>, InformerRegistry) {
    let source = Arc::new(MemorySource::new());
    let factory = Arc::new(
        SharedInformerFactory::builder()
            .source(Arc::clone(&source) as Arc<dyn SourceProvider>)
            .default_resync(Duration::ZERO)
            .relist_backoff(Duration::from_millis(10))
            .shutdown_grace_period(Duration::from_secs(2))
            .build()
            .expect("factory should build"),
    );
    let registry =
        InformerRegistry::with_builtin_types(Arc::clone(&factory)).expect("registry should build");
    (source, factory, registry)
}

fn widgets() -> ResourceKey {
    ResourceKey::new("example.com", "v1", "widgets")
}

#[test]
fn every_builtin_key_resolves() {
    let (_, factory, registry) = setup();

    let keys = registry.keys();
    assert_eq!(keys.len(), 38);
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());

    for key in &keys {
        let handle = registry.lookup(key).expect("builtin key should resolve");
        assert_eq!(handle.resource(), key);
        assert_eq!(handle.lister().resource(), &key.group_resource());
    }
    assert_eq!(factory.informer_count(), 38);
}

#[test]
fn unknown_keys_are_unsupported() {
    let (_, factory, registry) = setup();

    let err = registry
        .lookup(&ResourceKey::new("", "internal", "widgets"))
        .expect_err("widgets are not built in");
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("widgets"));

    // A different version of a built-in type is a different key.
    assert!(registry
        .lookup(&ResourceKey::new("apps", "v1", "statefulsets"))
        .expect_err("no v1 registration")
        .is_unsupported());
    assert_eq!(factory.informer_count(), 0);
}

#[test]
fn lookup_and_typed_accessor_share_one_informer() {
    let (_, factory, registry) = setup();

    let by_key = registry
        .lookup(&ResourceKey::new("rbac.authorization.k8s.io", "internal", "roles"))
        .unwrap();
    let by_accessor = factory.rbac().internal_version().roles().informer().unwrap();
    let by_type = factory.informer_for::<rbac::Role>().unwrap();

    assert!(Arc::ptr_eq(&by_key.informer(), &by_accessor));
    assert!(Arc::ptr_eq(&by_accessor, &by_type));
    assert_eq!(factory.construction_count(), 1);
}

#[test]
fn concurrent_lookups_across_types() {
    let (_, factory, registry) = setup();
    let registry = Arc::new(registry);
    let keys = Arc::new(registry.keys());

    let handles: Vec<_> = (0..8)
        .map(|offset| {
            let registry = Arc::clone(&registry);
            let keys = Arc::clone(&keys);
            std::thread::spawn(move || {
                for i in 0..keys.len() {
                    let key = &keys[(i + offset) % keys.len()];
                    registry.lookup(key).expect("lookup should succeed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }
    assert_eq!(factory.informer_count(), 38);
    assert_eq!(factory.construction_count(), 38);
}

#[test]
fn custom_type_registered_at_runtime() {
    let (_, factory, registry) = setup();
    let constructed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&constructed);
    let provider: InformerProvider = Arc::new(move |factory: &SharedInformerFactory| {
        let key = widgets();
        factory.informer_for_key(&key, |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.default_informer(&key)
        })
    });
    registry.register(widgets(), provider).unwrap();

    let first = registry.lookup(&widgets()).unwrap();
    let second = registry.lookup(&widgets()).unwrap();
    assert!(Arc::ptr_eq(&first.informer(), &second.informer()));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(factory.existing(&widgets()).map(|i| i.resource().clone()), Some(widgets()));
}

#[tokio::test]
async fn end_to_end_generic_listing() {
    let (source, factory, registry) = setup();

    source.seed(
        &core_api::Pod::resource_key(),
        [
            Arc::new(core_api::Pod::new(
                ObjectMeta::namespaced("default", "web-0").with_label("app", "web"),
            )) as BoxObject,
            Arc::new(core_api::Pod::new(
                ObjectMeta::namespaced("default", "db-0").with_label("app", "db"),
            )) as BoxObject,
            Arc::new(core_api::Pod::new(
                ObjectMeta::namespaced("kube-system", "dns-0").with_label("app", "dns"),
            )) as BoxObject,
        ],
    );
    source.insert(
        &apps::StatefulSet::resource_key(),
        Arc::new(apps::StatefulSet::new(ObjectMeta::namespaced("default", "web"))),
    );

    let pods = registry
        .lookup(&ResourceKey::new("", "internal", "pods"))
        .unwrap();
    let sets = registry
        .lookup(&ResourceKey::new("apps", "internal", "statefulsets"))
        .unwrap();

    assert_eq!(factory.start().unwrap(), 2);
    let synced = factory.wait_for_cache_sync(Duration::from_secs(5)).await;
    assert_eq!(synced.len(), 2);
    assert!(synced.values().all(|s| *s));

    let all = pods.lister().list(&Selector::everything());
    assert_eq!(all.len(), 3);

    let web = pods.lister().list(&Selector::parse("app=web").unwrap());
    assert_eq!(web.len(), 1);
    assert_eq!(web[0].name(), "web-0");

    let default_pods = pods.lister().by_namespace("default");
    assert_eq!(default_pods.list(&Selector::everything()).len(), 2);
    assert_eq!(default_pods.get("db-0").unwrap().name(), "db-0");
    assert!(default_pods.get("dns-0").unwrap_err().is_not_found());

    let set = sets.lister().get("default/web").unwrap();
    assert_eq!(set.namespace(), Some("default"));

    // The typed lister reads the same cache.
    let typed = factory.core().internal_version().pods().lister().unwrap();
    let dns = typed.by_namespace("kube-system").get("dns-0").unwrap();
    assert_eq!(dns.metadata.labels.get("app").map(String::as_str), Some("dns"));

    assert!(factory.shutdown().await);
}

#[tokio::test]
async fn dynamic_objects_through_custom_provider() {
    let (source, factory, registry) = setup();

    source.insert(
        &widgets(),
        Arc::new(
            DynamicObject::new("example.com/v1", "Widget", ObjectMeta::namespaced("default", "gear"))
                .with_data(serde_json::json!({"spec": {"teeth": 12}})),
        ),
    );
    registry
        .register(
            widgets(),
            Arc::new(|factory: &SharedInformerFactory| {
                let key = widgets();
                factory.informer_for_key(&key, |ctx| ctx.default_informer(&key))
            }),
        )
        .unwrap();

    let handle = registry.lookup(&widgets()).unwrap();
    factory.start().unwrap();
    factory.wait_for_cache_sync(Duration::from_secs(5)).await;

    let gear = handle.lister().by_namespace("default").get("gear").unwrap();
    let widget = gear
        .as_any()
        .downcast_ref::<DynamicObject>()
        .expect("widget should be a dynamic object");
    assert_eq!(widget.kind, "Widget");
    assert_eq!(widget.data["spec"]["teeth"], 12);

    factory.shutdown().await;
}
