//! Domain layer.

pub mod errors;
pub mod feature;

pub use errors::FeaturesSyncError;
pub use feature::{feature_id, FeatureState};

/// Name of the cluster map holding the features of `group`.
#[must_use]
pub fn features_map_name(group: &str) -> String {
    format!("features.{group}")
}

/// Name of the cluster map holding the feature repositories of `group`.
#[must_use]
pub fn repositories_map_name(group: &str) -> String {
    format!("repositories.{group}")
}
