//! # Node Runtime Library
//!
//! Assembles a cluster node from its components and runs it. The binary in
//! `main.rs` is a thin wrapper around `NodeRuntime`.
//!
//! ## Event Flow
//!
//! ```text
//! local change ─→ BusProducer ──(switch, OUTBOUND policy)──→ ClusterFabric
//!                                                                │
//!   remote node ←── EventConsumer ←──(addressed, switch)─────────┘
//!                        │
//!                        ↓
//!                EventDispatcher ─→ EventHandlerRegistry ─→ handler
//!                                   (handler switch, INBOUND policy)
//! ```
//!
//! Commands follow the same path and are correlated through the node's
//! `CommandStore`.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod runtime;

pub use container::{
    load_config, load_config_with, ClusterFabric, ClusterNode, ConfigError, NodeConfig, NodeError,
};
pub use runtime::NodeRuntime;
