//! # nebucloud-informers
//!
//! Shared informers with runtime lookup by resource key.
//!
//! A controller that only learns at runtime which resource type it has to
//! watch asks the registry for `group/version/resource` and gets back a
//! handle to the one shared informer of that type:
//!
//! ```rust,ignore
//! use nebucloud_informers::prelude::*;
//!
//! let factory = Arc::new(
//!     SharedInformerFactory::builder()
//!         .source(Arc::new(MemorySource::new()))
//!         .build()?,
//! );
//! let registry = InformerRegistry::with_builtin_types(Arc::clone(&factory))?;
//!
//! let handle = registry.lookup(&ResourceKey::new("apps", "internal", "statefulsets"))?;
//! factory.start()?;
//! factory.wait_for_cache_sync(Duration::from_secs(10)).await;
//! let sets = handle.lister().list(&Selector::everything());
//! ```
//!
//! ## Architecture
//!
//! - `informer-core` - resource keys, object model, errors, built-in types
//! - `informer-cache` - indexed store, listers, shared index informer, sources
//! - `informer-factory` - shared factory, typed accessors, generic registry
//!
//! This crate (`nebucloud-informers`) re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **No panics in library code** - All errors are returned as `Result`
//! 2. **No locks held across await points** - DashMap and short parking_lot sections
//! 3. **One informer per type** - lookups and typed accessors share instances
//! 4. **Exact lookups** - a key matches a registration exactly or not at all

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use informer_cache as cache;
pub use informer_core as core;
pub use informer_factory as factory;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use nebucloud_informers::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use informer_core::{
        BoxObject, DynamicObject, GroupResource, GroupVersion, InformerError, InformerResult,
        Object, ObjectMeta, Resource, ResourceKey,
    };

    // Cache types
    pub use informer_cache::{
        GenericLister, Indexer, Lister, MemorySource, ObjectEvent, Selector,
        SharedIndexInformer, SourceProvider, Store, Watch, WatchEvent,
    };

    // Factory types
    pub use informer_factory::{
        FactoryConfig, GenericHandle, GenericInformer, InformerRegistry, SharedInformerFactory,
        SharedInformerFactoryBuilder,
    };

    pub use std::sync::Arc;
    pub use std::time::Duration;
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("nebucloud-informers {} (MSRV {})", VERSION, MSRV)
    }
}
