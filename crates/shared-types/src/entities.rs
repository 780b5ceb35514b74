//! # Core Domain Entities
//!
//! Identity of cluster members and the direction of an event relative to
//! the local node.
//!
//! ## Clusters
//!
//! - **Membership**: `NodeId`, `Node`
//! - **Direction**: `EventType`
//! - **Synchronization**: `SyncSummary`

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the group every node belongs to unless configured otherwise.
pub const DEFAULT_GROUP_NAME: &str = "default";

// =============================================================================
// CLUSTER A: MEMBERSHIP
// =============================================================================

/// Unique identifier of a node in the cluster.
///
/// Not guaranteed to be stable across restarts of the same process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A cluster member as reported by the membership collaborator.
///
/// Equality, ordering and hashing consider the id only: the address is
/// informational and may differ between two observations of the same node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    host: String,
    port: u16,
}

impl Node {
    /// Create a node value.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
        }
    }

    /// Node identifier.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Host the node listens on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port the node listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form of the address.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.host, self.port)
    }
}

// =============================================================================
// CLUSTER B: DIRECTION
// =============================================================================

/// Direction of an event relative to the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Remote state arriving at the local node.
    Inbound,
    /// Local state leaving for the cluster.
    Outbound,
}

impl EventType {
    /// Lowercase name used in configuration keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER C: SYNCHRONIZATION
// =============================================================================

/// Counts of one pull-then-push pass over the local groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Groups with synchronization enabled.
    pub groups: usize,
    /// Local resources changed from the cluster copy.
    pub pulled: usize,
    /// Local resources published to the cluster.
    pub pushed: usize,
}

impl std::ops::AddAssign for SyncSummary {
    fn add_assign(&mut self, other: Self) {
        self.groups += other.groups;
        self.pulled += other.pulled;
        self.pushed += other.pushed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_node_identity_ignores_address() {
        let a = Node::new("node-a", "10.0.0.1", 5701);
        let moved = Node::new("node-a", "10.0.0.9", 5702);
        assert_eq!(a, moved);

        let set: BTreeSet<Node> = [a, moved].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_node_address_format() {
        let node = Node::new("node-a", "localhost", 5701);
        assert_eq!(node.address(), "localhost:5701");
        assert_eq!(node.to_string(), "node-a@localhost:5701");
    }

    #[test]
    fn test_sync_summaries_add_up() {
        let mut total = SyncSummary::default();
        total += SyncSummary { groups: 1, pulled: 2, pushed: 0 };
        total += SyncSummary { groups: 1, pulled: 0, pushed: 3 };
        assert_eq!(total, SyncSummary { groups: 2, pulled: 2, pushed: 3 });
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::Inbound.as_str(), "inbound");
        assert_eq!(EventType::Outbound.to_string(), "outbound");
    }

    #[test]
    fn test_node_id_serde_transparent() {
        let id = NodeId::new("node-b");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"node-b\"");
    }
}
