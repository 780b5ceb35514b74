//! Adapters for the configuration store port.

pub mod memory;

pub use memory::InMemoryConfigurationStore;
