//! # Cluster Groups
//!
//! Named sets of nodes sharing one synchronization policy.
//!
//! ## Model
//!
//! A group has members, an optional parent it inherits lists from, and four
//! pattern tables keyed by resource category:
//!
//! | Table | Consulted for |
//! |-------|---------------|
//! | inbound whitelist / blacklist | Remote state arriving at this node |
//! | outbound whitelist / blacklist | Local state leaving this node |
//!
//! The `default` group always exists and cannot be deleted.
//!
//! Group policy is held per node. Membership is not: each node keeps one
//! record in the distributed `cluster.groups` map, and members are read
//! from there.
//!
//! ## Module Structure
//!
//! ```text
//! domain/   - Group, FilterTables, GroupDefinition, NodeGroups, GroupError
//! ports/    - GroupDirectory (read), GroupMembership (write)
//! service/  - GroupManager
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    CategoryPolicy, FilterTables, Group, GroupDefinition, GroupError, ListPair, ListType,
    NodeGroups, GROUPS_MAP_NAME,
};
pub use ports::{GroupDirectory, GroupMembership};
pub use service::GroupManager;
