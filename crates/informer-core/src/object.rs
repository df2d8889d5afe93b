//! Object traits and metadata.
//!
//! Informer stores are type-erased: they hold [`BoxObject`] values and only
//! rely on the [`Object`] trait. Concrete API types additionally implement
//! [`Resource`], which carries the static identity of their resource type
//! and lets typed listers downcast back out of the store.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{GroupResource, ResourceKey};

/// Metadata every stored object carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique within its namespace.
    pub name: String,
    /// Namespace, `None` for cluster-scoped objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque version assigned by the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Server-assigned unique id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Labels used by selectors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata for a cluster-scoped object.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Metadata for a namespaced object.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the resource version.
    #[must_use]
    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }
}

/// An object that can live in an informer store.
pub trait Object: Send + Sync + fmt::Debug {
    /// Object metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Object name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Namespace, if the object is namespaced.
    fn namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }

    /// Server resource version, if known.
    fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared object into a shared `Any` for downcasting.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared, type-erased object as held by stores and delivered to handlers.
pub type BoxObject = Arc<dyn Object>;

/// Static identity of a concrete resource type.
pub trait Resource: Object + Sized + 'static {
    /// API group, empty for core.
    const GROUP: &'static str;
    /// API version.
    const VERSION: &'static str;
    /// Lower-case plural resource name.
    const PLURAL: &'static str;
    /// Kind name.
    const KIND: &'static str;
    /// Whether objects of this type live in a namespace.
    const NAMESPACED: bool;

    /// The key under which this type is registered.
    fn resource_key() -> ResourceKey {
        ResourceKey::new(Self::GROUP, Self::VERSION, Self::PLURAL)
    }

    /// Group and resource without the version.
    fn group_resource() -> GroupResource {
        GroupResource::new(Self::GROUP, Self::PLURAL)
    }
}

/// Downcast a stored object to a concrete resource type.
///
/// Returns `None` if the object is of a different type.
pub fn downcast<K: Resource>(object: &BoxObject) -> Option<Arc<K>> {
    Arc::clone(object).into_any().downcast::<K>().ok()
}

/// Schemaless object, usable for types without a Rust definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObject {
    /// `group/version` of the object.
    #[serde(default)]
    pub api_version: String,
    /// Kind name.
    #[serde(default)]
    pub kind: String,
    /// Standard metadata.
    pub metadata: ObjectMeta,
    /// Everything else, unparsed.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl DynamicObject {
    /// Create a dynamic object of the given kind.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, metadata: ObjectMeta) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata,
            data: serde_json::Value::Null,
        }
    }

    /// Attach the unparsed body.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl Object for DynamicObject {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
