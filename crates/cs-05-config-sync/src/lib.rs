//! # Configuration Synchronization
//!
//! Keeps the configurations of a group's members equal.
//!
//! Each group owns a cluster map `config.<group>` of pid → properties.
//! A node writes its local changes there and announces them with a
//! `Configuration` event; receivers read the map and apply the copy when it
//! differs from theirs. Node-local properties (`service.pid`, deployment
//! scanner paths, Maven repositories) never travel.
//!
//! ```text
//! local change ─► ConfigurationSynchronizer ─► config.<group> map
//!                                          └─► Configuration event
//!                                                   │
//! remote node ◄─ ConfigurationEventHandler ◄────────┘ (inbound policy)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryConfigurationStore;
pub use domain::{
    configuration_map_name, filter_properties, is_excluded_property, merge_for_pull,
    properties_equal, ConfigSyncError, Properties, EXCLUDED_PROPERTIES,
};
pub use ports::ConfigurationStore;
pub use service::{ConfigurationEventHandler, ConfigurationSynchronizer};
pub use shared_types::SyncSummary;
