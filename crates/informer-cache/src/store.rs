//! Store trait and the thread-safe [`Indexer`].
//!
//! The indexer keeps every object of one resource type keyed by
//! `namespace/name` (or just `name` for cluster-scoped objects) and
//! maintains secondary indices computed by [`IndexFunc`]s.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use informer_core::{BoxObject, InformerError, InformerResult, Object};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::stats::StoreStats;

/// Name of the built-in namespace index.
pub const NAMESPACE_INDEX: &str = "namespace";

/// Computes the index values of an object.
pub type IndexFunc = Arc<dyn Fn(&dyn Object) -> Vec<String> + Send + Sync>;

/// Store key of an object: `namespace/name`, or `name` when cluster-scoped.
pub fn object_key(object: &dyn Object) -> String {
    match object.namespace() {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, object.name()),
        _ => object.name().to_string(),
    }
}

/// Index function for [`NAMESPACE_INDEX`].
pub fn namespace_index_func() -> IndexFunc {
    Arc::new(|object: &dyn Object| {
        object
            .namespace()
            .map(|ns| vec![ns.to_string()])
            .unwrap_or_default()
    })
}

/// Trait for object stores backing an informer.
pub trait Store: Send + Sync {
    /// Insert or replace an object, returning the previous value.
    fn upsert(&self, object: BoxObject) -> Option<BoxObject>;

    /// Remove an object, returning the stored value.
    fn delete(&self, object: &dyn Object) -> Option<BoxObject>;

    /// Get an object by store key.
    fn get_by_key(&self, key: &str) -> Option<BoxObject>;

    /// All objects.
    fn list(&self) -> Vec<BoxObject>;

    /// All store keys.
    fn list_keys(&self) -> Vec<String>;

    /// Replace the whole content, returning the previous content by key.
    fn replace(&self, objects: Vec<BoxObject>) -> HashMap<String, BoxObject>;

    /// Number of stored objects.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct IndexerState {
    items: HashMap<String, BoxObject>,
    indexers: HashMap<String, IndexFunc>,
    /// index name -> index value -> store keys
    indices: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl IndexerState {
    fn index_object(&mut self, key: &str, object: &dyn Object) {
        for (name, func) in &self.indexers {
            let index = self.indices.entry(name.clone()).or_default();
            for value in func(object) {
                index.entry(value).or_default().insert(key.to_string());
            }
        }
    }

    fn unindex_object(&mut self, key: &str, object: &dyn Object) {
        for (name, func) in &self.indexers {
            let Some(index) = self.indices.get_mut(name) else {
                continue;
            };
            for value in func(object) {
                if let Some(keys) = index.get_mut(&value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        index.remove(&value);
                    }
                }
            }
        }
    }
}

/// Thread-safe indexed store.
///
/// Items and indices live under a single lock so readers never observe an
/// index that disagrees with the items. Locks are never held across an
/// `.await`.
pub struct Indexer {
    state: RwLock<IndexerState>,
    stats: StoreStats,
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Indexer")
            .field("items", &state.items.len())
            .field("indexers", &state.indexers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer {
    /// Create an indexer with the namespace index configured.
    pub fn new() -> Self {
        let mut state = IndexerState::default();
        state
            .indexers
            .insert(NAMESPACE_INDEX.to_string(), namespace_index_func());
        Self {
            state: RwLock::new(state),
            stats: StoreStats::new(),
        }
    }

    /// Add a named index.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the store already holds objects.
    pub fn add_indexer(&self, name: impl Into<String>, func: IndexFunc) -> InformerResult<()> {
        let name = name.into();
        let mut state = self.state.write();
        if !state.items.is_empty() {
            return Err(InformerError::Configuration(format!(
                "cannot add index {name:?} to a populated store"
            )));
        }
        if state.indexers.contains_key(&name) {
            return Err(InformerError::Configuration(format!(
                "index {name:?} already exists"
            )));
        }
        debug!(index = %name, "added indexer");
        state.indexers.insert(name, func);
        Ok(())
    }

    /// Store statistics.
    #[inline]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Objects whose `index_name` index contains `value`.
    pub fn by_index(&self, index_name: &str, value: &str) -> InformerResult<Vec<BoxObject>> {
        let state = self.state.read();
        if !state.indexers.contains_key(index_name) {
            return Err(InformerError::UnknownIndex(index_name.to_string()));
        }
        let objects = state
            .indices
            .get(index_name)
            .and_then(|index| index.get(value))
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| state.items.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(objects)
    }

    /// Store keys whose `index_name` index contains `value`.
    pub fn index_keys(&self, index_name: &str, value: &str) -> InformerResult<Vec<String>> {
        let state = self.state.read();
        if !state.indexers.contains_key(index_name) {
            return Err(InformerError::UnknownIndex(index_name.to_string()));
        }
        Ok(state
            .indices
            .get(index_name)
            .and_then(|index| index.get(value))
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// All values present in an index.
    pub fn index_values(&self, index_name: &str) -> Vec<String> {
        self.state
            .read()
            .indices
            .get(index_name)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Store for Indexer {
    fn upsert(&self, object: BoxObject) -> Option<BoxObject> {
        let key = object_key(object.as_ref());
        let mut state = self.state.write();
        let previous = state.items.insert(key.clone(), Arc::clone(&object));
        if let Some(old) = &previous {
            state.unindex_object(&key, old.as_ref());
        }
        state.index_object(&key, object.as_ref());
        self.stats.record_upsert();
        trace!(key = %key, replaced = previous.is_some(), "upsert");
        previous
    }

    fn delete(&self, object: &dyn Object) -> Option<BoxObject> {
        let key = object_key(object);
        let mut state = self.state.write();
        let removed = state.items.remove(&key);
        if let Some(old) = &removed {
            state.unindex_object(&key, old.as_ref());
            self.stats.record_delete();
            trace!(key = %key, "delete");
        }
        removed
    }

    fn get_by_key(&self, key: &str) -> Option<BoxObject> {
        // Clone the Arc so the read guard is released immediately.
        let result = self.state.read().items.get(key).cloned();

        if result.is_some() {
            self.stats.record_hit();
            trace!(key = %key, "store hit");
        } else {
            self.stats.record_miss();
            trace!(key = %key, "store miss");
        }

        result
    }

    fn list(&self) -> Vec<BoxObject> {
        self.state.read().items.values().cloned().collect()
    }

    fn list_keys(&self) -> Vec<String> {
        self.state.read().items.keys().cloned().collect()
    }

    fn replace(&self, objects: Vec<BoxObject>) -> HashMap<String, BoxObject> {
        let mut state = self.state.write();
        let previous = std::mem::take(&mut state.items);
        state.indices.clear();
        for object in objects {
            let key = object_key(object.as_ref());
            state.index_object(&key, object.as_ref());
            state.items.insert(key, object);
        }
        self.stats.record_replace();
        debug!(
            previous = previous.len(),
            current = state.items.len(),
            "replaced store content"
        );
        previous
    }

    fn len(&self) -> usize {
        self.state.read().items.len()
    }
}
