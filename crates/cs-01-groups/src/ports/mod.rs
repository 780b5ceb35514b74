//! Ports layer.

pub mod inbound;

pub use inbound::{GroupDirectory, GroupMembership};
