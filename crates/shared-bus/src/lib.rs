//! # Shared Bus - Event Transport for Cluster Nodes
//!
//! Carries `ClusterEvent`s between nodes and exposes the distributed maps
//! handlers use to share state.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Node A     │                    │   Node B     │
//! │   producer   │    publish()       │   consumer   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Guarantees
//!
//! - **At-most-once:** a lagging subscriber loses the oldest events
//! - **Type-preserving:** the payload variant is the routing key
//! - **Per-subscriber order:** events arrive in publish order

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod maps;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{
    BundleAction, BundleChange, ChangeType, ClusterEvent, ConfigurationChange, EventFilter,
    EventKind, EventPayload, FeatureAction, FeatureChange, RepositoryAction, RepositoryChange,
    Resource, BUNDLE_CATEGORY, CONFIGURATION_CATEGORY, FEATURES_CATEGORY,
};
pub use maps::{ClusterMap, DistributedMaps, InMemoryMaps, MapError};
pub use publisher::{EventTransport, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
