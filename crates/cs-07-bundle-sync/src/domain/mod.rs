//! Domain layer.

pub mod bundle;
pub mod errors;

pub use bundle::{bundle_id, BundleInfo, BundleState};
pub use errors::BundleSyncError;

/// Name of the cluster map holding the bundles of `group`.
#[must_use]
pub fn bundle_map_name(group: &str) -> String {
    format!("bundle.{group}")
}
