//! # Outbound Port - FeaturesService
//!
//! The node's local provisioning service, as seen by the synchronizer.

use crate::domain::{FeatureState, FeaturesSyncError};

/// Local feature repositories and features.
pub trait FeaturesService: Send + Sync {
    /// Registered repository urls, sorted.
    fn list_repositories(&self) -> Vec<String>;

    /// Register a repository. Adding a known url is a no-op.
    fn add_repository(&self, url: &str) -> Result<(), FeaturesSyncError>;

    /// Returns false if `url` was not registered.
    fn remove_repository(&self, url: &str) -> bool;

    /// Every feature the repositories provide, ordered by name then version.
    fn list_features(&self) -> Vec<FeatureState>;

    fn is_installed(&self, name: &str, version: Option<&str>) -> bool;

    /// Install `name`. Without a version the highest known one is used.
    fn install_feature(&self, name: &str, version: Option<&str>) -> Result<(), FeaturesSyncError>;

    /// Returns false if the feature was not installed.
    fn uninstall_feature(&self, name: &str, version: Option<&str>) -> bool;
}
