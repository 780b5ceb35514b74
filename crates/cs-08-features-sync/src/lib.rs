//! # Features Synchronization
//!
//! Keeps the feature repositories and installed features of a group's
//! members equal.
//!
//! | Cluster map | Key | Value |
//! |-------------|-----|-------|
//! | `repositories.<group>` | repository url | url |
//! | `features.<group>` | `name/version` | [`FeatureState`] |
//!
//! Features are filtered by name under the `features` category.
//! Repositories are not filtered: a feature cannot resolve without its
//! repository.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryFeaturesService;
pub use domain::{
    feature_id, features_map_name, repositories_map_name, FeatureState, FeaturesSyncError,
};
pub use ports::FeaturesService;
pub use service::{FeaturesEventHandler, FeaturesSynchronizer, RepositoryEventHandler};
