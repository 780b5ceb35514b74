//! # Event Transport
//!
//! Defines the publishing side of the event bus and the in-process
//! implementation used when every node shares one address space.

use crate::events::{ClusterEvent, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Fire-and-forget broadcast between nodes.
///
/// Delivery is at-most-once. The payload variant survives transport so
/// receivers can route on `ClusterEvent::kind`.
pub trait EventTransport: Send + Sync {
    /// Publish an event to every subscriber.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    fn publish(&self, event: ClusterEvent) -> usize;

    /// Subscribe to events matching a filter.
    fn subscribe(&self, filter: EventFilter) -> Subscription;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Every node attached to the same bus sees every event, including its own.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<ClusterEvent>,

    /// Active subscription count by filter.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTransport for InMemoryEventBus {
    fn publish(&self, event: ClusterEvent) -> usize {
        let kind = event.kind();
        let source = event.source_id().cloned();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    kind = %kind,
                    source = ?source,
                    receivers = receiver_count,
                    "Event published"
                );
                receiver_count
            }
            Err(e) => {
                // No receivers - event is dropped
                warn!(
                    kind = %kind,
                    source = ?source,
                    error = %e,
                    "Event dropped (no receivers)"
                );
                0
            }
        }
    }

    fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let filter_key = format!("{:?}", filter.kinds);

        *self
            .subscriptions
            .write()
            .entry(filter_key.clone())
            .or_insert(0) += 1;

        debug!(kinds = ?filter.kinds, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), filter_key)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
