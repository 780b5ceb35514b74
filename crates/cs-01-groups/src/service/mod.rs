//! Service layer.

pub mod manager;

pub use manager::GroupManager;
