//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{ClusterEvent, EventFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// A subscription handle for receiving events.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<ClusterEvent>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Filter key for this subscription.
    filter_key: String,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<ClusterEvent>,
        filter: EventFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        filter_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            subscriptions,
            filter_key,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<ClusterEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    // At-most-once delivery: lagging drops the oldest events
                    warn!(lagged = count, "Subscriber lagged, some events dropped");
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<ClusterEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        let Some(count) = subs.get_mut(&self.filter_key) else {
            debug!(filter = %self.filter_key, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Subscription dropped");
    }
}
