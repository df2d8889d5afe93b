//! # informer-cache
//!
//! Indexed object cache and shared informer for a single resource type.
//!
//! This crate provides the caching layer underneath the informer factory:
//!
//! - [`Indexer`] - thread-safe store keyed by `namespace/name` with secondary indices
//! - [`SharedIndexInformer`] - list/watch driven mirror of one resource type
//! - [`Watch`] - subscription to [`ObjectEvent`]s of an informer
//! - [`GenericLister`] / [`Lister`] - read-only accessors over an indexer
//! - [`ListerWatcher`] / [`SourceProvider`] - where informers get their data
//!
//! ## Key Design Decisions
//!
//! - Store items and indices share one lock, never held across `.await`
//! - Objects are `Arc`-shared between the store, listers and event handlers
//! - Handler channels are unbounded so no event is dropped
//!
//! ## Example
//!
//! ```rust,ignore
//! use informer_cache::{MemorySource, SharedIndexInformer, SourceProvider};
//! use informer_core::{api::core::Pod, Resource};
//!
//! let source = MemorySource::new();
//! let lw = source.lister_watcher(&Pod::resource_key(), None)?;
//! let informer = Arc::new(SharedIndexInformer::new(Pod::resource_key(), lw, Duration::ZERO));
//! tokio::spawn(Arc::clone(&informer).run(stop_rx));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod informer;
mod lister;
mod selector;
mod source;
mod stats;
mod store;
mod watch;

pub use informer::{SharedIndexInformer, StopReceiver, DEFAULT_RELIST_BACKOFF};
pub use lister::{GenericLister, GenericNamespaceLister, Lister, NamespaceLister};
pub use selector::Selector;
pub use source::{
    ListerWatcher, MemorySource, ObjectList, SourceProvider, WatchEvent, WatchStream,
};
pub use stats::StoreStats;
pub use store::{namespace_index_func, object_key, IndexFunc, Indexer, Store, NAMESPACE_INDEX};
pub use watch::{ObjectEvent, Watch, WatchId, WatchManager};
