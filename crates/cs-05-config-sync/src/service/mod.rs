//! Service layer.

pub mod handler;
pub mod synchronizer;

pub use handler::ConfigurationEventHandler;
pub use synchronizer::ConfigurationSynchronizer;
