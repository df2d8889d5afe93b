//! The shared informer factory.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use informer_cache::{SharedIndexInformer, SourceProvider};
use informer_core::{InformerError, InformerResult, Resource, ResourceKey};
use tracing::{debug, info, instrument, warn};

use crate::builder::SharedInformerFactoryBuilder;
use crate::config::FactoryConfig;
use crate::shutdown::StopController;

/// What a custom constructor gets to build an informer with.
#[derive(Debug, Clone, Copy)]
pub struct InformerContext<'a> {
    /// Factory configuration.
    pub config: &'a FactoryConfig,
    /// Source of list/watch access.
    pub source: &'a dyn SourceProvider,
}

impl InformerContext<'_> {
    /// Build the informer the factory would build for `resource` by default.
    ///
    /// Fails with [`InformerError::ConstructionFailed`] when the source
    /// cannot serve `resource`.
    pub fn default_informer(&self, resource: &ResourceKey) -> InformerResult<SharedIndexInformer> {
        let lister_watcher = self
            .source
            .lister_watcher(resource, self.config.namespace.as_deref())
            .map_err(|err| InformerError::construction(resource.clone(), err))?;
        Ok(SharedIndexInformer::new(
            resource.clone(),
            lister_watcher,
            self.config.resync_for(resource),
        )
        .with_relist_backoff(self.config.relist_backoff))
    }
}

/// Creates informers on demand and shares one instance per resource type.
///
/// Construction for a resource type happens at most once, even under
/// concurrent first requests. A failed construction leaves no entry behind
/// so a later request tries again.
pub struct SharedInformerFactory {
    config: FactoryConfig,
    source: Arc<dyn SourceProvider>,
    informers: DashMap<ResourceKey, Arc<SharedIndexInformer>>,
    started: DashSet<ResourceKey>,
    stop: StopController,
    constructions: AtomicU64,
}

impl fmt::Debug for SharedInformerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedInformerFactory")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("informers", &self.informers.len())
            .field("started", &self.started.len())
            .field("stopped", &self.stop.is_stopped())
            .finish()
    }
}

impl SharedInformerFactory {
    pub(crate) fn new(source: Arc<dyn SourceProvider>, config: FactoryConfig) -> Self {
        Self {
            config,
            source,
            informers: DashMap::new(),
            started: DashSet::new(),
            stop: StopController::new(),
            constructions: AtomicU64::new(0),
        }
    }

    /// Create a builder.
    pub fn builder() -> SharedInformerFactoryBuilder {
        SharedInformerFactoryBuilder::new()
    }

    /// Factory configuration.
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Source informers are built from.
    pub fn source(&self) -> &Arc<dyn SourceProvider> {
        &self.source
    }

    /// Shared informer for resource type `K`.
    pub fn informer_for<K: Resource>(&self) -> InformerResult<Arc<SharedIndexInformer>> {
        let resource = K::resource_key();
        self.informer_for_key(&resource, |ctx| ctx.default_informer(&resource))
    }

    /// Shared informer for `resource`, built with `new_informer` if none exists yet.
    ///
    /// `new_informer` runs while the entry for `resource` is locked; it must not
    /// call back into this factory.
    #[instrument(skip_all, fields(resource = %resource))]
    pub fn informer_for_key<F>(
        &self,
        resource: &ResourceKey,
        new_informer: F,
    ) -> InformerResult<Arc<SharedIndexInformer>>
    where
        F: FnOnce(InformerContext<'_>) -> InformerResult<SharedIndexInformer>,
    {
        if let Some(existing) = self.informers.get(resource) {
            return Ok(Arc::clone(existing.value()));
        }

        match self.informers.entry(resource.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let ctx = InformerContext {
                    config: &self.config,
                    source: self.source.as_ref(),
                };
                let informer = Arc::new(new_informer(ctx)?);
                self.constructions.fetch_add(1, Ordering::Relaxed);
                debug!(resync = ?informer.resync_period(), "constructed informer");
                entry.insert(Arc::clone(&informer));
                Ok(informer)
            }
        }
    }

    /// Informer already constructed for `resource`, if any.
    pub fn existing(&self, resource: &ResourceKey) -> Option<Arc<SharedIndexInformer>> {
        self.informers
            .get(resource)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of informers constructed so far.
    pub fn informer_count(&self) -> usize {
        self.informers.len()
    }

    /// How many times an informer was actually constructed.
    pub fn construction_count(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Keys of every constructed informer, sorted.
    pub fn resources(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.informers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Start every informer that is not running yet.
    ///
    /// Safe to call repeatedly; informers requested after a call are started
    /// by the next one. Returns how many informers were started.
    ///
    /// # Errors
    ///
    /// Fails after [`shutdown`](Self::shutdown) or outside a tokio runtime.
    pub fn start(&self) -> InformerResult<usize> {
        if self.stop.is_stopped() {
            return Err(InformerError::Stopped);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| InformerError::internal("start requires a tokio runtime", e))?;

        let pending: Vec<_> = self
            .informers
            .iter()
            .filter(|entry| self.started.insert(entry.key().clone()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for informer in &pending {
            let guard = self.stop.register_run();
            let stop = self.stop.subscribe();
            let informer = Arc::clone(informer);
            runtime.spawn(async move {
                let _guard = guard;
                informer.run(stop).await;
            });
        }

        if !pending.is_empty() {
            info!(started = pending.len(), total = self.informers.len(), "started informers");
        }
        Ok(pending.len())
    }

    /// Wait until every started informer has synced or `timeout` elapses.
    ///
    /// Returns the sync state per started informer.
    pub async fn wait_for_cache_sync(&self, timeout: Duration) -> HashMap<ResourceKey, bool> {
        let informers: Vec<_> = self
            .informers
            .iter()
            .filter(|entry| self.started.contains(entry.key()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let all_synced = || informers.iter().all(|i| i.has_synced());
        let wait = async {
            while !all_synced() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        if tokio::time::timeout(timeout, wait).await.is_err() {
            warn!(?timeout, "timed out waiting for informer caches to sync");
        }

        informers
            .iter()
            .map(|i| (i.resource().clone(), i.has_synced()))
            .collect()
    }

    /// Stop every running informer and wait up to the configured grace period.
    ///
    /// Returns `true` if all informers stopped in time.
    pub async fn shutdown(&self) -> bool {
        self.stop.stop(self.config.shutdown_grace_period).await
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.stop.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use informer_cache::{MemorySource, Store};
    use informer_core::api::core::{Node, Pod};
    use informer_core::{BoxObject, ObjectMeta};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn factory(source: Arc<MemorySource>) -> SharedInformerFactory {
        SharedInformerFactory::builder()
            .source(source)
            .default_resync(Duration::ZERO)
            .shutdown_grace_period(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    #[test]
    fn informer_for_is_shared() {
        let factory = factory(Arc::new(MemorySource::new()));

        let a = factory.informer_for::<Pod>().unwrap();
        let b = factory.informer_for::<Pod>().unwrap();
        let node = factory.informer_for::<Node>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &node));
        assert_eq!(factory.informer_count(), 2);
        assert_eq!(factory.construction_count(), 2);
        assert_eq!(factory.resources(), vec![Node::resource_key(), Pod::resource_key()]);
    }

    #[test]
    fn failed_construction_is_retried() {
        let factory = factory(Arc::new(MemorySource::new()));
        let key = ResourceKey::new("example.com", "v1", "widgets");

        let err = factory
            .informer_for_key(&key, |_| {
                Err(InformerError::Configuration("no backend".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, InformerError::Configuration(_)));
        assert!(factory.existing(&key).is_none());

        let informer = factory
            .informer_for_key(&key, |ctx| ctx.default_informer(&key))
            .unwrap();
        assert_eq!(informer.resource(), &key);
    }

    #[derive(Debug)]
    struct UnreachableSource;

    impl SourceProvider for UnreachableSource {
        fn lister_watcher(
            &self,
            resource: &ResourceKey,
            _namespace: Option<&str>,
        ) -> InformerResult<Arc<dyn informer_cache::ListerWatcher>> {
            Err(InformerError::ListFailed {
                resource: resource.group_resource(),
                message: "backend unreachable".to_string(),
            })
        }
    }

    #[test]
    fn unservable_source_fails_construction() {
        let factory = SharedInformerFactory::builder()
            .source(Arc::new(UnreachableSource))
            .build()
            .unwrap();

        match factory.informer_for::<Pod>().unwrap_err() {
            InformerError::ConstructionFailed { key, source, .. } => {
                assert_eq!(key, Pod::resource_key());
                let source = source.expect("source error kept");
                assert!(source.to_string().contains("backend unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(factory.existing(&Pod::resource_key()).is_none());
        assert_eq!(factory.informer_count(), 0);
    }

    #[test]
    fn concurrent_first_requests_construct_once() {
        let factory = Arc::new(factory(Arc::new(MemorySource::new())));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = ResourceKey::new("example.com", "v1", "widgets");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                let calls = Arc::clone(&calls);
                let key = key.clone();
                thread::spawn(move || {
                    factory
                        .informer_for_key(&key, |ctx| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            ctx.default_informer(&key)
                        })
                        .unwrap()
                })
            })
            .collect();

        let informers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(informers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn start_outside_runtime_fails() {
        let factory = factory(Arc::new(MemorySource::new()));
        factory.informer_for::<Pod>().unwrap();
        assert!(factory.start().is_err());
    }

    #[tokio::test]
    async fn start_sync_and_shutdown() {
        let source = Arc::new(MemorySource::new());
        source.insert(
            &Pod::resource_key(),
            Arc::new(Pod::new(ObjectMeta::namespaced("default", "web"))),
        );
        let factory = factory(Arc::clone(&source));

        let pods = factory.informer_for::<Pod>().unwrap();
        assert_eq!(factory.start().unwrap(), 1);
        // Already running informers are not started twice.
        assert_eq!(factory.start().unwrap(), 0);

        let synced = factory.wait_for_cache_sync(Duration::from_secs(5)).await;
        assert_eq!(synced.get(&Pod::resource_key()), Some(&true));
        assert_eq!(pods.indexer().len(), 1);

        // Late requests are picked up by the next start.
        factory.informer_for::<Node>().unwrap();
        assert_eq!(factory.start().unwrap(), 1);

        assert!(factory.shutdown().await);
        assert!(factory.is_shut_down());
        assert!(matches!(factory.start(), Err(InformerError::Stopped)));
    }

    #[tokio::test]
    async fn namespace_restricts_informers() {
        let source = Arc::new(MemorySource::new());
        source.seed(
            &Pod::resource_key(),
            [
                Arc::new(Pod::new(ObjectMeta::namespaced("default", "a"))) as BoxObject,
                Arc::new(Pod::new(ObjectMeta::namespaced("kube-system", "b"))) as BoxObject,
            ],
        );
        let factory = SharedInformerFactory::builder()
            .source(source)
            .namespace("kube-system")
            .build()
            .unwrap();

        let pods = factory.informer_for::<Pod>().unwrap();
        factory.start().unwrap();
        factory.wait_for_cache_sync(Duration::from_secs(5)).await;

        let names: Vec<_> = pods
            .indexer()
            .list()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        assert_eq!(names, vec!["b"]);
        factory.shutdown().await;
    }
}
