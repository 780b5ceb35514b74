//! Service layer.

pub mod handler;
pub mod synchronizer;

pub use handler::BundleEventHandler;
pub use synchronizer::BundleSynchronizer;
