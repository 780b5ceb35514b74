//! Cluster-wide membership records.
//!
//! Every node owns one record in the shared [`GROUPS_MAP_NAME`] map, keyed
//! by its id, listing the groups it belongs to. Group members are computed
//! from these records, so a join made on one node is seen by all of them.

use serde::{Deserialize, Serialize};
use shared_types::Node;
use std::collections::BTreeSet;

/// Name of the distributed map holding one [`NodeGroups`] per node.
pub const GROUPS_MAP_NAME: &str = "cluster.groups";

/// Groups one node belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroups {
    pub node: Node,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl NodeGroups {
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self {
            node,
            groups: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}
