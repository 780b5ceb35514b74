//! # Inbound Ports
//!
//! Read and write views of group state offered to the other subsystems.
//!
//! | Trait | Consumers |
//! |-------|-----------|
//! | `GroupDirectory` | Filtering engine, command destination resolution, config sync |
//! | `GroupMembership` | `ManageGroup` command handler |

use crate::domain::{Group, GroupError, ListType};
use shared_types::{EventType, Node};
use std::collections::BTreeSet;

/// Read-only view of the current group state.
///
/// Every call observes the latest membership and tables; implementations
/// must not cache across calls.
pub trait GroupDirectory: Send + Sync {
    /// The node this process runs as.
    fn local_node(&self) -> Node;

    fn find_group_by_name(&self, name: &str) -> Option<Group>;

    /// Current members of `group`, or `None` if the group does not exist.
    fn members(&self, group: &str) -> Option<BTreeSet<Node>>;

    /// Patterns for `category` with parent groups folded in.
    ///
    /// Returns `None` if the group does not exist.
    fn resolve_list(
        &self,
        group: &str,
        list: ListType,
        category: &str,
        direction: EventType,
    ) -> Option<BTreeSet<String>>;

    /// Groups the local node belongs to, ordered by name.
    fn list_local_groups(&self) -> Vec<Group>;

    fn is_sync_enabled(&self, group: &str, category: &str) -> bool;
}

/// Local membership changes requested by operators or remote commands.
pub trait GroupMembership: Send + Sync {
    /// Join `name`, creating it if needed.
    fn register_group(&self, name: &str) -> Result<Group, GroupError>;

    /// Leave `name`.
    fn unregister_group(&self, name: &str) -> Result<(), GroupError>;

    /// Names of the groups the local node belongs to.
    fn list_local_group_names(&self) -> BTreeSet<String>;
}
