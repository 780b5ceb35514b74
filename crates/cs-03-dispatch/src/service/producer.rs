//! # Bus Producer
//!
//! `EventProducer` over an `EventTransport`.
//!
//! ## Gates
//!
//! 1. Switch: OFF drops the event unless it is forced or a command result.
//! 2. Outbound filter: events naming a resource are checked against the
//!    outbound lists of their group (or the default group). Forced events
//!    are filtered too.

use crate::ports::{EventProducer, ProduceOutcome};
use cs_02_filtering::ResourceFilter;
use shared_bus::{ClusterEvent, EventTransport};
use shared_types::{EventType, Node, Switch, DEFAULT_GROUP_NAME};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Switch id of the node's producer.
pub const PRODUCER_SWITCH_ID: &str = "producer";

/// Counters of a producer.
#[derive(Debug, Default)]
pub struct ProducerStats {
    pub published: AtomicU64,
    pub switched_off: AtomicU64,
    pub denied: AtomicU64,
}

/// Publishes local events onto the cluster transport.
pub struct BusProducer {
    transport: Arc<dyn EventTransport>,
    local: Node,
    switch: Switch,
    filter: Arc<dyn ResourceFilter>,
    stats: ProducerStats,
}

impl BusProducer {
    #[must_use]
    pub fn new(
        transport: Arc<dyn EventTransport>,
        local: Node,
        filter: Arc<dyn ResourceFilter>,
    ) -> Self {
        Self::with_switch(transport, local, filter, Switch::new(PRODUCER_SWITCH_ID))
    }

    /// Build a producer gated by an existing switch handle.
    #[must_use]
    pub fn with_switch(
        transport: Arc<dyn EventTransport>,
        local: Node,
        filter: Arc<dyn ResourceFilter>,
        switch: Switch,
    ) -> Self {
        Self {
            transport,
            local,
            switch,
            filter,
            stats: ProducerStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &ProducerStats {
        &self.stats
    }

    fn outbound_allowed(&self, event: &ClusterEvent) -> bool {
        let Some(resource) = event.resource() else {
            return true;
        };
        let group = event.source_group.as_deref().unwrap_or(DEFAULT_GROUP_NAME);
        self.filter
            .is_allowed(group, resource.category, resource.id, EventType::Outbound)
    }
}

impl EventProducer for BusProducer {
    fn produce(&self, mut event: ClusterEvent) -> ProduceOutcome {
        if !self.switch.is_on() && !event.force && !event.is_result() {
            self.stats.switched_off.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event.id, kind = %event.kind(), "Producer switched off, event dropped");
            return ProduceOutcome::SwitchedOff;
        }

        if !self.outbound_allowed(&event) {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event.id, kind = %event.kind(), "Event denied by outbound policy");
            return ProduceOutcome::Denied;
        }

        event.source_node = Some(self.local.clone());
        let event_id = event.id;
        let kind = event.kind();
        let receivers = self.transport.publish(event);
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        trace!(%event_id, %kind, receivers, "Event published");
        ProduceOutcome::Published { receivers }
    }

    fn local_node(&self) -> &Node {
        &self.local
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }
}
