//! # informer-core
//!
//! Core types shared by the informer crates:
//!
//! - [`ResourceKey`] - group/version/resource identifier of a resource type
//! - [`Object`] / [`Resource`] - type-erased and typed views of API objects
//! - [`InformerError`] - error type with helpers for propagation
//! - [`api`] - built-in resource types of the internal API version
//!
//! ## Example
//!
//! ```rust
//! use informer_core::api::core::Pod;
//! use informer_core::{ObjectMeta, Resource, ResourceKey};
//!
//! let pod = Pod::new(ObjectMeta::namespaced("default", "pod-a"));
//! assert_eq!(Pod::resource_key(), ResourceKey::new("", "internal", "pods"));
//! assert_eq!(pod.metadata.name, "pod-a");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
mod error;
mod object;
mod resource_key;

pub use error::InformerError;
pub use object::{downcast, BoxObject, DynamicObject, Object, ObjectMeta, Resource};
pub use resource_key::{GroupResource, GroupVersion, ResourceKey, CORE_GROUP, INTERNAL_VERSION};

/// Result type alias using [`InformerError`].
pub type InformerResult<T> = std::result::Result<T, InformerError>;
