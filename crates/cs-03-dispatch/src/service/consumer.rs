//! # Event Consumer
//!
//! Receiving side of a node: reads the transport subscription and hands
//! every accepted event to the dispatcher.
//!
//! An event is accepted when it is addressed to the local node and either
//! the consumer switch is ON, the event is forced, or it is a command
//! result.

use crate::service::EventDispatcher;
use shared_bus::{ClusterEvent, Subscription};
use shared_types::{NodeId, Switch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Switch id of the node's consumer.
pub const CONSUMER_SWITCH_ID: &str = "consumer";

/// Counters of a consumer.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    pub accepted: AtomicU64,
    pub not_addressed: AtomicU64,
    pub switched_off: AtomicU64,
}

/// Feeds transport events into the local dispatcher.
pub struct EventConsumer {
    local: NodeId,
    switch: Switch,
    dispatcher: Arc<EventDispatcher>,
    stats: ConsumerStats,
}

impl EventConsumer {
    #[must_use]
    pub fn new(local: NodeId, dispatcher: Arc<EventDispatcher>) -> Self {
        Self::with_switch(local, dispatcher, Switch::new(CONSUMER_SWITCH_ID))
    }

    #[must_use]
    pub fn with_switch(local: NodeId, dispatcher: Arc<EventDispatcher>, switch: Switch) -> Self {
        Self {
            local,
            switch,
            dispatcher,
            stats: ConsumerStats::default(),
        }
    }

    #[must_use]
    pub fn switch(&self) -> &Switch {
        &self.switch
    }

    #[must_use]
    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Hand `event` to the dispatcher if it passes the consumer gates.
    ///
    /// Returns true when the event was queued.
    pub fn accept(&self, event: ClusterEvent) -> bool {
        if !event.is_addressed_to(&self.local) {
            self.stats.not_addressed.fetch_add(1, Ordering::Relaxed);
            trace!(event_id = %event.id, node = %self.local, "Event not addressed to this node");
            return false;
        }

        if !self.switch.is_on() && !event.force && !event.is_result() {
            self.stats.switched_off.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event.id, kind = %event.kind(), "Consumer switched off, event not consumed");
            return false;
        }

        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.submit(event);
        true
    }

    /// Consume `subscription` until the bus closes or `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        info!(node = %self.local, "Event consumer started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = subscription.recv() => {
                    let Some(event) = event else {
                        debug!(node = %self.local, "Event bus closed");
                        break;
                    };
                    self.accept(event);
                }
            }
        }
        info!(node = %self.local, "Event consumer stopped");
    }
}
