//! Group entity and its configuration form.

use super::lists::{FilterTables, ListType};
use serde::{Deserialize, Serialize};
use shared_types::{EventType, Node, NodeId, DEFAULT_GROUP_NAME};
use std::collections::{BTreeMap, BTreeSet};

/// A named set of nodes sharing one synchronization policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    members: BTreeSet<Node>,
    parent: Option<String>,
    tables: FilterTables,
    /// Per-category sync flag. Missing categories are synchronized.
    sync: BTreeMap<String, bool>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
            parent: None,
            tables: FilterTables::new(),
            sync: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GROUP_NAME
    }

    #[must_use]
    pub fn members(&self) -> &BTreeSet<Node> {
        &self.members
    }

    #[must_use]
    pub fn member_ids(&self) -> BTreeSet<NodeId> {
        self.members.iter().map(|n| n.id().clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, node: &NodeId) -> bool {
        self.members.iter().any(|n| n.id() == node)
    }

    /// Add a member. Returns false if it was already present.
    pub fn add_member(&mut self, node: Node) -> bool {
        // Replace so a changed address is picked up
        let fresh = !self.contains(node.id());
        self.members.replace(node);
        fresh
    }

    /// Remove a member. Returns false if it was absent.
    pub fn remove_member(&mut self, node: &NodeId) -> bool {
        let before = self.members.len();
        self.members.retain(|n| n.id() != node);
        before != self.members.len()
    }

    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    #[must_use]
    pub fn tables(&self) -> &FilterTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut FilterTables {
        &mut self.tables
    }

    #[must_use]
    pub fn is_sync_enabled(&self, category: &str) -> bool {
        self.sync.get(category).copied().unwrap_or(true)
    }

    pub fn set_sync(&mut self, category: &str, enabled: bool) {
        self.sync.insert(category.to_string(), enabled);
    }

    pub(crate) fn copy_policy_from(&mut self, other: &Group) {
        self.tables = other.tables.clone();
        self.sync = other.sync.clone();
    }
}

/// Whitelist and blacklist of one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPair {
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Policy of one resource category within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    #[serde(default = "default_sync")]
    pub sync: bool,
    #[serde(default)]
    pub inbound: ListPair,
    #[serde(default)]
    pub outbound: ListPair,
}

fn default_sync() -> bool {
    true
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            sync: true,
            inbound: ListPair::default(),
            outbound: ListPair::default(),
        }
    }
}

/// Declarative form of a group, as read from configuration files.
///
/// ```toml
/// [[groups]]
/// name = "default"
///
/// [groups.categories.config.inbound]
/// whitelist = ["*"]
/// blacklist = ["org.apache.karaf.shell"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryPolicy>,
}

impl GroupDefinition {
    /// Policy shipped for the default group: configurations of the local
    /// runtime (logging, web container, deployment scanner) stay local.
    #[must_use]
    pub fn default_group() -> Self {
        let local_only = [
            "org.apache.felix.fileinstall*",
            "org.apache.karaf.management",
            "org.apache.karaf.shell",
            "org.ops4j.pax.logging",
            "org.ops4j.pax.web",
        ];
        let config = CategoryPolicy {
            sync: true,
            inbound: ListPair {
                whitelist: vec!["*".to_string()],
                blacklist: local_only.iter().map(|s| s.to_string()).collect(),
            },
            outbound: ListPair {
                whitelist: vec!["*".to_string()],
                blacklist: local_only.iter().map(|s| s.to_string()).collect(),
            },
        };
        Self {
            name: DEFAULT_GROUP_NAME.to_string(),
            parent: None,
            categories: BTreeMap::from([("config".to_string(), config)]),
        }
    }

    /// Write this definition's lists and sync flags onto `group`.
    pub fn apply_to(&self, group: &mut Group) {
        for (category, policy) in &self.categories {
            let tables = group.tables_mut();
            for (direction, pair) in [
                (EventType::Inbound, &policy.inbound),
                (EventType::Outbound, &policy.outbound),
            ] {
                tables.set_patterns(ListType::Whitelist, category, direction, pair.whitelist.iter().cloned());
                tables.set_patterns(ListType::Blacklist, category, direction, pair.blacklist.iter().cloned());
            }
            group.set_sync(category, policy.sync);
        }
    }
}
