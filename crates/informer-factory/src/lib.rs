//! # informer-factory
//!
//! Shared informer factory and generic informer registry.
//!
//! - [`SharedInformerFactory`] - builds one shared informer per resource type
//! - [`InformerRegistry`] - resolves a runtime resource key to a [`GenericHandle`]
//! - typed accessors such as `factory.core().internal_version().pods()`
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use informer_cache::{MemorySource, Selector};
//! use informer_core::ResourceKey;
//! use informer_factory::{GenericInformer, InformerRegistry, SharedInformerFactory};
//!
//! let factory = Arc::new(
//!     SharedInformerFactory::builder()
//!         .source(Arc::new(MemorySource::new()))
//!         .build()?,
//! );
//! let registry = InformerRegistry::with_builtin_types(Arc::clone(&factory))?;
//!
//! let pods = registry.lookup(&ResourceKey::new("", "internal", "pods"))?;
//! factory.start()?;
//! factory.wait_for_cache_sync(Duration::from_secs(10)).await;
//! for pod in pods.lister().list(&Selector::everything()) {
//!     println!("{}", pod.name());
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod factory;
mod generic;
pub mod groups;
mod shutdown;

pub use builder::SharedInformerFactoryBuilder;
pub use config::FactoryConfig;
pub use factory::{InformerContext, SharedInformerFactory};
pub use generic::{
    provider_for, GenericHandle, GenericInformer, InformerProvider, InformerRegistry,
    RegistryBuilder,
};
pub use groups::ResourceInformer;
pub use shutdown::{wait_for_signal, RunGuard, StopController};
