//! Domain layer: groups and their filtering tables.

pub mod errors;
pub mod group;
pub mod lists;
pub mod membership;

pub use errors::GroupError;
pub use group::{CategoryPolicy, Group, GroupDefinition, ListPair};
pub use lists::{FilterTables, ListType};
pub use membership::{NodeGroups, GROUPS_MAP_NAME};
