//! # Bundle Synchronization
//!
//! Keeps the bundles installed on a group's members equal.
//!
//! Each group owns a cluster map `bundle.<group>` of `symbolic_name/version`
//! → [`BundleInfo`]. The stored state is the one every member should reach:
//!
//! | Cluster state | Effect of a pull |
//! |---------------|------------------|
//! | `Installed` | install if missing |
//! | `Resolved` | install if missing, stop if running |
//! | `Active` | install if missing, then start |
//!
//! Bundles are filtered by location under the `bundle` category.
//!
//! ```text
//! local change ─► BundleSynchronizer ─► bundle.<group> map
//!                                   └─► Bundle event
//!                                            │
//! remote node ◄─ BundleEventHandler ◄────────┘ (inbound policy)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryBundleRuntime;
pub use domain::{bundle_id, bundle_map_name, BundleInfo, BundleState, BundleSyncError};
pub use ports::BundleRuntime;
pub use service::{BundleEventHandler, BundleSynchronizer};
