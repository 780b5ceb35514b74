//! Service layer.

pub mod handler;
pub mod synchronizer;

pub use handler::{FeaturesEventHandler, RepositoryEventHandler};
pub use synchronizer::FeaturesSynchronizer;
