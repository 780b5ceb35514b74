//! Service layer.

pub mod engine;

pub use engine::{FilterStats, FilteringEngine};
