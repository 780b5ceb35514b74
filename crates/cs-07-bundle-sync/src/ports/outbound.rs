//! # Outbound Port - BundleRuntime
//!
//! The node's local module framework, as seen by the synchronizer.

use crate::domain::{BundleInfo, BundleSyncError};

/// Local bundles keyed by `symbolic_name/version`.
pub trait BundleRuntime: Send + Sync {
    /// Every installed bundle, ordered by id.
    fn list(&self) -> Vec<BundleInfo>;

    fn get(&self, id: &str) -> Option<BundleInfo>;

    fn find_by_location(&self, location: &str) -> Option<BundleInfo>;

    /// Install `bundle` in the `Installed` state. Installing a present
    /// bundle is a no-op.
    fn install(&self, bundle: &BundleInfo) -> Result<(), BundleSyncError>;

    fn start(&self, id: &str) -> Result<(), BundleSyncError>;

    /// Stop a bundle, leaving it `Resolved`.
    fn stop(&self, id: &str) -> Result<(), BundleSyncError>;

    /// Reload a bundle from its location. The state is kept.
    fn update(&self, id: &str) -> Result<(), BundleSyncError>;

    /// Remove `id`. Returns false if it was not installed.
    fn uninstall(&self, id: &str) -> Result<bool, BundleSyncError>;
}
