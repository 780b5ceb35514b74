//! Adapters for the bundle runtime port.

pub mod memory;

pub use memory::InMemoryBundleRuntime;
