//! # Outbound Port - EventProducer
//!
//! Sending side of a node, handed to handlers and the command layer.

use shared_bus::ClusterEvent;
use shared_types::{Node, Switch};

/// What happened to an event handed to a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProduceOutcome {
    /// Handed to the transport.
    Published { receivers: usize },
    /// The producer switch is OFF and the event was not forced.
    SwitchedOff,
    /// Outbound policy of the event's group denies the resource.
    Denied,
}

impl ProduceOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Publishes events from the local node to the cluster.
pub trait EventProducer: Send + Sync {
    /// Stamp the local node on `event` and publish it if allowed.
    fn produce(&self, event: ClusterEvent) -> ProduceOutcome;

    /// Node stamped as the source of produced events.
    fn local_node(&self) -> &Node;

    /// Gate consulted before publishing non-forced events.
    fn switch(&self) -> &Switch;
}
