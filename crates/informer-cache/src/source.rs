//! List/watch sources feeding informers.
//!
//! A [`SourceProvider`] hands out one [`ListerWatcher`] per resource type.
//! [`MemorySource`] is an in-process implementation that keeps a bounded
//! history of events so a watch opened after a list never misses changes.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use informer_core::{BoxObject, InformerError, InformerResult, ResourceKey};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

use crate::store::object_key;

/// Change reported by a watch stream.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Object created.
    Added(BoxObject),
    /// Object changed.
    Modified(BoxObject),
    /// Object removed.
    Deleted(BoxObject),
    /// Progress marker without an object.
    Bookmark {
        /// Version the stream has reached.
        resource_version: String,
    },
}

impl WatchEvent {
    fn object(&self) -> Option<&BoxObject> {
        match self {
            Self::Added(o) | Self::Modified(o) | Self::Deleted(o) => Some(o),
            Self::Bookmark { .. } => None,
        }
    }
}

/// Result of a list call.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    /// Every object of the type.
    pub items: Vec<BoxObject>,
    /// Version to start watching from.
    pub resource_version: String,
}

/// Stream of watch events.
pub type WatchStream = BoxStream<'static, InformerResult<WatchEvent>>;

/// List and watch access to a single resource type.
#[async_trait]
pub trait ListerWatcher: Send + Sync {
    /// List every object.
    async fn list(&self) -> InformerResult<ObjectList>;

    /// Watch for changes after `resource_version`.
    async fn watch(&self, resource_version: &str) -> InformerResult<WatchStream>;
}

/// Hands out list/watch access per resource type.
pub trait SourceProvider: Send + Sync + fmt::Debug {
    /// Lister/watcher for `resource`, restricted to `namespace` when given.
    fn lister_watcher(
        &self,
        resource: &ResourceKey,
        namespace: Option<&str>,
    ) -> InformerResult<Arc<dyn ListerWatcher>>;
}

const DEFAULT_HISTORY: usize = 1024;

#[derive(Debug)]
struct CollectionState {
    objects: BTreeMap<String, BoxObject>,
    version: u64,
    /// Recent events tagged with the version they produced.
    history: VecDeque<(u64, WatchEvent)>,
}

#[derive(Debug)]
struct Collection {
    resource: ResourceKey,
    state: Mutex<CollectionState>,
    events: broadcast::Sender<(u64, WatchEvent)>,
    history_limit: usize,
}

impl Collection {
    fn new(resource: ResourceKey, history_limit: usize) -> Self {
        let (events, _) = broadcast::channel(history_limit.max(1));
        Self {
            resource,
            state: Mutex::new(CollectionState {
                objects: BTreeMap::new(),
                version: 0,
                history: VecDeque::new(),
            }),
            events,
            history_limit,
        }
    }

    fn apply(&self, event: WatchEvent) -> u64 {
        let mut state = self.state.lock();
        self.record(&mut state, event)
    }

    /// Store `object`, recording `Added` or `Modified` depending on whether
    /// its key was already present. Decided under the state lock.
    fn upsert(&self, object: BoxObject) -> u64 {
        let mut state = self.state.lock();
        let event = if state.objects.contains_key(&object_key(object.as_ref())) {
            WatchEvent::Modified(object)
        } else {
            WatchEvent::Added(object)
        };
        self.record(&mut state, event)
    }

    fn record(&self, state: &mut CollectionState, event: WatchEvent) -> u64 {
        state.version += 1;
        let version = state.version;

        match &event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => {
                state
                    .objects
                    .insert(object_key(object.as_ref()), Arc::clone(object));
            }
            WatchEvent::Deleted(object) => {
                state.objects.remove(&object_key(object.as_ref()));
            }
            WatchEvent::Bookmark { .. } => {}
        }

        state.history.push_back((version, event.clone()));
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }

        // Sent under the lock so a concurrent watch sees each event exactly once.
        let _ = self.events.send((version, event));
        trace!(resource = %self.resource, version, "applied event");
        version
    }
}

fn in_namespace(object: &BoxObject, namespace: Option<&str>) -> bool {
    match namespace {
        Some(ns) => object.namespace() == Some(ns),
        None => true,
    }
}

/// In-process source of objects, one collection per resource key.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use informer_cache::MemorySource;
/// use informer_core::api::core::Pod;
/// use informer_core::{ObjectMeta, Resource};
///
/// let source = MemorySource::new();
/// source.insert(&Pod::resource_key(), Arc::new(Pod::new(ObjectMeta::named("pod-a"))));
/// assert_eq!(source.len(&Pod::resource_key()), 1);
/// ```
#[derive(Debug)]
pub struct MemorySource {
    collections: DashMap<ResourceKey, Arc<Collection>>,
    history_limit: usize,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Create an empty source keeping `limit` events per collection for
    /// watch resumption.
    pub fn with_history(limit: usize) -> Self {
        Self {
            collections: DashMap::new(),
            history_limit: limit,
        }
    }

    fn collection(&self, resource: &ResourceKey) -> Arc<Collection> {
        // Clone the Arc out so no shard lock outlives this call.
        let entry = self
            .collections
            .entry(resource.clone())
            .or_insert_with(|| Arc::new(Collection::new(resource.clone(), self.history_limit)));
        Arc::clone(entry.value())
    }

    /// Create or replace an object.
    pub fn insert(&self, resource: &ResourceKey, object: BoxObject) -> u64 {
        self.collection(resource).upsert(object)
    }

    /// Remove an object, if present.
    pub fn remove(&self, resource: &ResourceKey, object: BoxObject) -> u64 {
        self.collection(resource).apply(WatchEvent::Deleted(object))
    }

    /// Seed a collection with objects.
    pub fn seed(&self, resource: &ResourceKey, objects: impl IntoIterator<Item = BoxObject>) {
        for object in objects {
            self.insert(resource, object);
        }
    }

    /// Number of objects stored for a resource.
    pub fn len(&self, resource: &ResourceKey) -> usize {
        self.collections
            .get(resource)
            .map(|c| c.state.lock().objects.len())
            .unwrap_or(0)
    }

    /// Whether nothing is stored for a resource.
    pub fn is_empty(&self, resource: &ResourceKey) -> bool {
        self.len(resource) == 0
    }
}

impl SourceProvider for MemorySource {
    fn lister_watcher(
        &self,
        resource: &ResourceKey,
        namespace: Option<&str>,
    ) -> InformerResult<Arc<dyn ListerWatcher>> {
        debug!(resource = %resource, namespace = ?namespace, "memory lister/watcher");
        Ok(Arc::new(MemoryListerWatcher {
            collection: self.collection(resource),
            namespace: namespace.map(str::to_string),
        }))
    }
}

struct MemoryListerWatcher {
    collection: Arc<Collection>,
    namespace: Option<String>,
}

impl MemoryListerWatcher {
    fn failed(&self, message: impl Into<String>) -> InformerError {
        InformerError::WatchFailed {
            resource: self.collection.resource.group_resource(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ListerWatcher for MemoryListerWatcher {
    async fn list(&self) -> InformerResult<ObjectList> {
        let state = self.collection.state.lock();
        let items = state
            .objects
            .values()
            .filter(|o| in_namespace(o, self.namespace.as_deref()))
            .cloned()
            .collect();
        Ok(ObjectList {
            items,
            resource_version: state.version.to_string(),
        })
    }

    async fn watch(&self, resource_version: &str) -> InformerResult<WatchStream> {
        let since: u64 = if resource_version.is_empty() {
            0
        } else {
            resource_version
                .parse()
                .map_err(|_| self.failed(format!("invalid resource version {resource_version:?}")))?
        };

        let (replay, receiver) = {
            let state = self.collection.state.lock();
            if since < state.version {
                let oldest = state.history.front().map(|(v, _)| *v).unwrap_or(u64::MAX);
                if oldest > since + 1 {
                    return Err(self.failed(format!(
                        "resource version {since} is too old, history starts at {oldest}"
                    )));
                }
            }
            let replay: Vec<(u64, WatchEvent)> = state
                .history
                .iter()
                .filter(|(v, _)| *v > since)
                .cloned()
                .collect();
            (replay, self.collection.events.subscribe())
        };

        let namespace = self.namespace.clone();
        let resource = self.collection.resource.group_resource();
        let live = BroadcastStream::new(receiver).map(move |item| {
            item.map_err(|err| InformerError::WatchFailed {
                resource: resource.clone(),
                message: err.to_string(),
            })
        });

        let stream = stream::iter(replay.into_iter().map(Ok))
            .chain(live)
            .filter_map(move |item| {
                let keep = match &item {
                    Ok((_, event)) => event
                        .object()
                        .map(|o| in_namespace(o, namespace.as_deref()))
                        .unwrap_or(true),
                    Err(_) => true,
                };
                futures::future::ready(keep.then(|| item.map(|(_, event)| event)))
            });

        Ok(stream.boxed())
    }
}
