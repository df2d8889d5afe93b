//! Read-only accessors over an informer's indexer.
//!
//! [`GenericLister`] works on type-erased objects and only needs the
//! resource's [`GroupResource`] to report misses. [`Lister`] is the typed
//! counterpart used by the per-type informer accessors.

use std::marker::PhantomData;
use std::sync::Arc;

use informer_core::{downcast, BoxObject, GroupResource, InformerError, InformerResult, Resource};

use crate::selector::Selector;
use crate::store::{Indexer, Store, NAMESPACE_INDEX};

/// Generic read access to the objects of one resource type.
///
/// Every lister built over the same indexer observes the same data.
#[derive(Debug, Clone)]
pub struct GenericLister {
    indexer: Arc<Indexer>,
    resource: GroupResource,
}

impl GenericLister {
    /// Create a lister over `indexer` for `resource`.
    pub fn new(indexer: Arc<Indexer>, resource: GroupResource) -> Self {
        Self { indexer, resource }
    }

    /// Resource served by this lister.
    pub fn resource(&self) -> &GroupResource {
        &self.resource
    }

    /// Objects matching `selector`, across all namespaces.
    pub fn list(&self, selector: &Selector) -> Vec<BoxObject> {
        let objects = self.indexer.list();
        if selector.is_empty() {
            return objects;
        }
        objects
            .into_iter()
            .filter(|o| selector.matches(&o.meta().labels))
            .collect()
    }

    /// Get an object by store key.
    ///
    /// The key is the object name for cluster-scoped resources and
    /// `namespace/name` for namespaced ones; use [`Self::by_namespace`] to
    /// look up namespaced objects by name alone.
    pub fn get(&self, name: &str) -> InformerResult<BoxObject> {
        self.indexer
            .get_by_key(name)
            .ok_or_else(|| InformerError::NotFound {
                resource: self.resource.clone(),
                name: name.to_string(),
            })
    }

    /// Restrict to one namespace.
    pub fn by_namespace(&self, namespace: impl Into<String>) -> GenericNamespaceLister {
        GenericNamespaceLister {
            indexer: Arc::clone(&self.indexer),
            resource: self.resource.clone(),
            namespace: namespace.into(),
        }
    }
}

/// Generic read access scoped to a single namespace.
#[derive(Debug, Clone)]
pub struct GenericNamespaceLister {
    indexer: Arc<Indexer>,
    resource: GroupResource,
    namespace: String,
}

impl GenericNamespaceLister {
    /// Namespace this lister is scoped to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Objects in the namespace matching `selector`.
    pub fn list(&self, selector: &Selector) -> Vec<BoxObject> {
        // The namespace index is installed by `Indexer::new` and cannot be removed.
        self.indexer
            .by_index(NAMESPACE_INDEX, &self.namespace)
            .unwrap_or_default()
            .into_iter()
            .filter(|o| selector.matches(&o.meta().labels))
            .collect()
    }

    /// Get an object by name.
    pub fn get(&self, name: &str) -> InformerResult<BoxObject> {
        let key = format!("{}/{}", self.namespace, name);
        self.indexer
            .get_by_key(&key)
            .ok_or_else(|| InformerError::NotFound {
                resource: self.resource.clone(),
                name: name.to_string(),
            })
    }
}

fn typed<K: Resource>(resource: &GroupResource, object: &BoxObject) -> InformerResult<Arc<K>> {
    downcast::<K>(object).ok_or_else(|| InformerError::TypeMismatch {
        resource: resource.clone(),
        expected: std::any::type_name::<K>(),
    })
}

/// Typed lister for resource type `K`.
#[derive(Debug)]
pub struct Lister<K> {
    inner: GenericLister,
    _type: PhantomData<fn() -> K>,
}

impl<K> Clone for Lister<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _type: PhantomData,
        }
    }
}

impl<K: Resource> Lister<K> {
    /// Create a typed lister over `indexer`.
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self {
            inner: GenericLister::new(indexer, K::group_resource()),
            _type: PhantomData,
        }
    }

    /// Objects matching `selector`. Objects of another type are skipped.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        self.inner
            .list(selector)
            .iter()
            .filter_map(downcast::<K>)
            .collect()
    }

    /// Get an object by store key.
    pub fn get(&self, name: &str) -> InformerResult<Arc<K>> {
        let object = self.inner.get(name)?;
        typed(self.inner.resource(), &object)
    }

    /// Restrict to one namespace.
    pub fn by_namespace(&self, namespace: impl Into<String>) -> NamespaceLister<K> {
        NamespaceLister {
            inner: self.inner.by_namespace(namespace),
            _type: PhantomData,
        }
    }

    /// The type-erased view of this lister.
    pub fn generic(&self) -> &GenericLister {
        &self.inner
    }
}

/// Typed lister scoped to a namespace.
#[derive(Debug)]
pub struct NamespaceLister<K> {
    inner: GenericNamespaceLister,
    _type: PhantomData<fn() -> K>,
}

impl<K: Resource> NamespaceLister<K> {
    /// Objects in the namespace matching `selector`.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        self.inner
            .list(selector)
            .iter()
            .filter_map(downcast::<K>)
            .collect()
    }

    /// Get an object by name.
    pub fn get(&self, name: &str) -> InformerResult<Arc<K>> {
        let object = self.inner.get(name)?;
        typed(&self.inner.resource, &object)
    }
}
