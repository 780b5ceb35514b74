//! Adapters for the features service port.

pub mod memory;

pub use memory::InMemoryFeaturesService;
