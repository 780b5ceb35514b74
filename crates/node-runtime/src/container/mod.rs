//! # Node Container
//!
//! Configuration and assembly of one cluster node.
//!
//! - Every component is wrapped in `Arc` for shared ownership
//! - Components talk to other nodes only through the `ClusterFabric`

pub mod config;
pub mod node;

pub use config::{load_config, load_config_with, ConfigError, NodeConfig};
pub use node::{ClusterFabric, ClusterNode, NodeError};
