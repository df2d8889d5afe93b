//! Shared informer for a single resource type.
//!
//! A [`SharedIndexInformer`] mirrors every object of one resource type into
//! an [`Indexer`] and fans changes out to event handlers. It is fed either by
//! [`SharedIndexInformer::run`] against a [`ListerWatcher`], or directly via
//! [`SharedIndexInformer::replace`] and [`SharedIndexInformer::apply`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use informer_core::{BoxObject, InformerError, InformerResult, ResourceKey};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::lister::GenericLister;
use crate::source::{ListerWatcher, WatchEvent};
use crate::store::{object_key, Indexer, Store};
use crate::watch::{ObjectEvent, Watch, WatchManager};

/// Default wait before relisting after a failed list or watch.
pub const DEFAULT_RELIST_BACKOFF: Duration = Duration::from_secs(1);

/// Receiver side of a stop signal. The informer stops once the value is
/// `true` or the sender is dropped.
pub type StopReceiver = watch::Receiver<bool>;

/// Informer mirroring one resource type, shared by every caller that asks
/// for that type.
pub struct SharedIndexInformer {
    resource: ResourceKey,
    indexer: Arc<Indexer>,
    watches: WatchManager,
    lister_watcher: Arc<dyn ListerWatcher>,
    resync_period: Duration,
    relist_backoff: Duration,
    synced: AtomicBool,
    started: AtomicBool,
    last_sync_resource_version: RwLock<Option<String>>,
}

impl fmt::Debug for SharedIndexInformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedIndexInformer")
            .field("resource", &self.resource)
            .field("objects", &self.indexer.len())
            .field("watches", &self.watches.watch_count())
            .field("resync_period", &self.resync_period)
            .field("synced", &self.has_synced())
            .field("started", &self.is_started())
            .finish()
    }
}

impl SharedIndexInformer {
    /// Create an informer. A zero `resync_period` disables periodic resync.
    pub fn new(
        resource: ResourceKey,
        lister_watcher: Arc<dyn ListerWatcher>,
        resync_period: Duration,
    ) -> Self {
        let watches = WatchManager::new(resource.group_resource());
        Self {
            resource,
            indexer: Arc::new(Indexer::new()),
            watches,
            lister_watcher,
            resync_period,
            relist_backoff: DEFAULT_RELIST_BACKOFF,
            synced: AtomicBool::new(false),
            started: AtomicBool::new(false),
            last_sync_resource_version: RwLock::new(None),
        }
    }

    /// Set the wait before relisting after an error.
    #[must_use]
    pub fn with_relist_backoff(mut self, backoff: Duration) -> Self {
        self.relist_backoff = backoff;
        self
    }

    /// Resource type mirrored by this informer.
    #[inline]
    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }

    /// The indexer holding the mirrored objects.
    #[inline]
    pub fn indexer(&self) -> Arc<Indexer> {
        Arc::clone(&self.indexer)
    }

    /// A generic lister over this informer's indexer.
    pub fn lister(&self) -> GenericLister {
        GenericLister::new(self.indexer(), self.resource.group_resource())
    }

    /// Periodic resync interval, zero when disabled.
    #[inline]
    pub fn resync_period(&self) -> Duration {
        self.resync_period
    }

    /// Whether the initial list has been stored.
    #[inline]
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Whether [`Self::run`] has been called.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Resource version of the last list or watch event applied.
    pub fn last_sync_resource_version(&self) -> Option<String> {
        self.last_sync_resource_version.read().clone()
    }

    /// Subscribe to object events.
    ///
    /// Objects already in the store are delivered first as
    /// [`ObjectEvent::Added`]. A change applied concurrently is seen exactly
    /// once, either in that replay or as a later event.
    pub fn add_event_handler(&self) -> Watch {
        self.watches.create_watch_with(|| {
            self.indexer
                .list()
                .into_iter()
                .map(ObjectEvent::Added)
                .collect()
        })
    }

    /// Number of subscribed event handlers.
    pub fn handler_count(&self) -> usize {
        self.watches.watch_count()
    }

    fn set_resource_version(&self, version: Option<&str>) {
        if let Some(version) = version.filter(|v| !v.is_empty()) {
            *self.last_sync_resource_version.write() = Some(version.to_string());
        }
    }

    /// Replace the store content with a full listing and mark the informer
    /// synced.
    ///
    /// Handlers receive `Added` for new objects, `Updated` for objects that
    /// were already known and `Deleted` for objects missing from the listing.
    pub fn replace(&self, objects: Vec<BoxObject>, resource_version: &str) {
        self.watches.publish(|| {
            let mut previous: HashMap<String, BoxObject> = self.indexer.replace(objects.clone());

            let mut events = Vec::with_capacity(objects.len() + previous.len());
            for object in objects {
                match previous.remove(&object_key(object.as_ref())) {
                    Some(old) => events.push(ObjectEvent::Updated { old, new: object }),
                    None => events.push(ObjectEvent::Added(object)),
                }
            }
            events.extend(previous.into_values().map(ObjectEvent::Deleted));

            self.set_resource_version(Some(resource_version));
            self.synced.store(true, Ordering::Release);

            debug!(
                resource = %self.resource,
                objects = self.indexer.len(),
                resource_version,
                "replaced informer content"
            );
            events
        });
    }

    /// Apply one watch event to the store and notify handlers.
    pub fn apply(&self, event: WatchEvent) {
        self.watches.publish(|| match event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => {
                self.set_resource_version(object.resource_version());
                match self.indexer.upsert(Arc::clone(&object)) {
                    Some(old) => vec![ObjectEvent::Updated { old, new: object }],
                    None => vec![ObjectEvent::Added(object)],
                }
            }
            WatchEvent::Deleted(object) => {
                self.set_resource_version(object.resource_version());
                match self.indexer.delete(object.as_ref()) {
                    Some(last) => vec![ObjectEvent::Deleted(last)],
                    None => {
                        trace!(resource = %self.resource, name = object.name(), "delete of unknown object");
                        Vec::new()
                    }
                }
            }
            WatchEvent::Bookmark { resource_version } => {
                self.set_resource_version(Some(&resource_version));
                Vec::new()
            }
        });
    }

    /// Re-deliver every stored object to handlers as an update.
    pub fn resync(&self) {
        self.watches.publish(|| {
            let objects = self.indexer.list();
            trace!(resource = %self.resource, objects = objects.len(), "resync");
            objects
                .into_iter()
                .map(|object| ObjectEvent::Updated {
                    old: Arc::clone(&object),
                    new: object,
                })
                .collect()
        });
    }

    /// List, then watch until `stop` fires, relisting after failures.
    ///
    /// Returns immediately if the informer is already running.
    pub async fn run(self: Arc<Self>, mut stop: StopReceiver) {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!(resource = %self.resource, "informer already started");
            return;
        }
        info!(resource = %self.resource, resync = ?self.resync_period, "informer started");

        loop {
            if *stop.borrow() {
                break;
            }
            match self.list_and_watch(&mut stop).await {
                Ok(()) => break,
                Err(err) => {
                    warn!(resource = %self.resource, error = %err, "list/watch failed, relisting");
                    tokio::select! {
                        _ = time::sleep(self.relist_backoff) => {}
                        _ = stop.changed() => break,
                    }
                }
            }
        }

        info!(resource = %self.resource, "informer stopped");
    }

    /// One list followed by a watch. `Ok` means a stop was requested.
    async fn list_and_watch(&self, stop: &mut StopReceiver) -> InformerResult<()> {
        let list = self.lister_watcher.list().await?;
        self.replace(list.items, &list.resource_version);

        let mut stream = self.lister_watcher.watch(&list.resource_version).await?;
        let mut ticker = self.resync_ticker();

        loop {
            tokio::select! {
                _ = stop.changed() => return Ok(()),
                _ = tick(&mut ticker) => self.resync(),
                next = stream.next() => match next {
                    Some(Ok(event)) => self.apply(event),
                    Some(Err(err)) => return Err(err),
                    None => {
                        return Err(InformerError::WatchFailed {
                            resource: self.resource.group_resource(),
                            message: "watch stream ended".to_string(),
                        })
                    }
                },
            }
        }
    }

    fn resync_ticker(&self) -> Option<Interval> {
        if self.resync_period.is_zero() {
            return None;
        }
        let mut interval = time::interval_at(Instant::now() + self.resync_period, self.resync_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(interval)
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
