//! Event subscriptions for informer updates.
//!
//! The watch system provides:
//! - Unique watch identifiers ([`WatchId`])
//! - Watch subscriptions ([`Watch`]) receiving [`ObjectEvent`]s
//! - Watch management ([`WatchManager`]) fanning events out to subscribers

use std::sync::atomic::{AtomicU64, Ordering};

use informer_core::{BoxObject, GroupResource, InformerError, InformerResult};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Change notification delivered to event handlers.
#[derive(Debug, Clone)]
pub enum ObjectEvent {
    /// Object appeared in the store.
    Added(BoxObject),
    /// Object changed. Periodic resyncs deliver `old` and `new` as the same object.
    Updated {
        /// Previous state.
        old: BoxObject,
        /// Current state.
        new: BoxObject,
    },
    /// Object left the store; carries its last known state.
    Deleted(BoxObject),
}

impl ObjectEvent {
    /// The object the event is about (the new state for updates).
    pub fn object(&self) -> &BoxObject {
        match self {
            Self::Added(object) | Self::Deleted(object) => object,
            Self::Updated { new, .. } => new,
        }
    }
}

/// Unique identifier for a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric value of this watch ID.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A subscription to the events of one informer.
#[derive(Debug)]
pub struct Watch {
    id: WatchId,
    resource: GroupResource,
    receiver: mpsc::UnboundedReceiver<ObjectEvent>,
}

impl Watch {
    /// Get the unique identifier for this watch.
    #[inline]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Resource the watch is subscribed to.
    #[inline]
    pub fn resource(&self) -> &GroupResource {
        &self.resource
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the watch has been cancelled.
    pub async fn recv(&mut self) -> Option<ObjectEvent> {
        self.receiver.recv().await
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<ObjectEvent, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

#[derive(Debug, Clone)]
struct WatchSender {
    id: WatchId,
    sender: mpsc::UnboundedSender<ObjectEvent>,
}

impl WatchSender {
    fn send(&self, event: ObjectEvent) -> InformerResult<()> {
        self.sender
            .send(event)
            .map_err(|_| InformerError::WatchClosed { watch_id: self.id.0 })
    }
}

/// Manager for the event subscriptions of one informer.
///
/// Subscribing and publishing both run under the subscriber lock, so a new
/// watch sees each change either in its initial snapshot or as an event,
/// never both and never neither. Channels are unbounded, sends never block
/// while the lock is held.
#[derive(Debug)]
pub struct WatchManager {
    resource: GroupResource,
    watches: Mutex<Vec<WatchSender>>,
}

impl WatchManager {
    /// Create a watch manager for a resource.
    pub fn new(resource: GroupResource) -> Self {
        Self {
            resource,
            watches: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to future events.
    pub fn create_watch(&self) -> Watch {
        self.create_watch_with(Vec::new)
    }

    /// Subscribe, queueing the events returned by `snapshot` ahead of any
    /// future event.
    ///
    /// `snapshot` runs with the subscriber lock held; no event is published
    /// between the snapshot and the subscription.
    pub fn create_watch_with<F>(&self, snapshot: F) -> Watch
    where
        F: FnOnce() -> Vec<ObjectEvent>,
    {
        let id = WatchId::next();
        let (sender, receiver) = mpsc::unbounded_channel();
        let watch_sender = WatchSender { id, sender };

        let replayed = {
            let mut watches = self.watches.lock();
            let initial = snapshot();
            let replayed = initial.len();
            for event in initial {
                // Receiver is alive, the send cannot fail here.
                let _ = watch_sender.send(event);
            }
            watches.push(watch_sender);
            replayed
        };

        debug!(watch_id = %id, resource = %self.resource, replayed, "created watch");

        Watch {
            id,
            resource: self.resource.clone(),
            receiver,
        }
    }

    /// Cancel a watch subscription.
    pub fn cancel_watch(&self, watch_id: WatchId) {
        let mut watches = self.watches.lock();
        if let Some(pos) = watches.iter().position(|s| s.id == watch_id) {
            watches.swap_remove(pos);
            debug!(watch_id = %watch_id, "cancelled watch");
            return;
        }

        warn!(watch_id = %watch_id, "attempted to cancel unknown watch");
    }

    /// Deliver an event to every subscriber.
    ///
    /// Removes closed watches and returns the number of deliveries.
    pub fn notify(&self, event: &ObjectEvent) -> usize {
        self.publish(|| vec![event.clone()])
    }

    /// Run `change` and deliver the events it returns to every subscriber.
    ///
    /// `change` runs with the subscriber lock held, so a store mutation made
    /// inside it is ordered against [`WatchManager::create_watch_with`]
    /// snapshots. Returns the number of deliveries.
    pub fn publish<F>(&self, change: F) -> usize
    where
        F: FnOnce() -> Vec<ObjectEvent>,
    {
        let mut watches = self.watches.lock();
        let events = change();
        if watches.is_empty() || events.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut closed = Vec::new();
        for event in &events {
            for sender in watches.iter() {
                if closed.contains(&sender.id) {
                    continue;
                }
                match sender.send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => closed.push(sender.id),
                }
            }
        }

        if !closed.is_empty() {
            watches.retain(|s| !closed.contains(&s.id));
            debug!(count = closed.len(), "removed closed watches");
        }

        trace!(resource = %self.resource, events = events.len(), delivered, "notified watches");
        delivered
    }

    /// Number of active watches.
    pub fn watch_count(&self) -> usize {
        self.watches.lock().len()
    }
}
