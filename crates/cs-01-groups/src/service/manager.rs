//! # Group Manager
//!
//! Group policy (lists, parent, sync flags) is owned by the local node and
//! sits behind a readers-writer lock, since the filtering engine consults it
//! on every event. Membership lives in the distributed `cluster.groups` map:
//! one record per node, updated atomically, so every node computes the same
//! members for a group.
//!
//! A group named only by a remote node's record is known locally too. It
//! carries a copy of the default group's policy until a definition is
//! applied.

use crate::domain::{
    Group, GroupDefinition, GroupError, ListType, NodeGroups, GROUPS_MAP_NAME,
};
use crate::ports::{GroupDirectory, GroupMembership};
use parking_lot::RwLock;
use shared_bus::{ClusterMap, DistributedMaps, MapError};
use shared_types::{EventType, Node, NodeId, DEFAULT_GROUP_NAME};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Group registry of one node.
pub struct GroupManager {
    local_node: Node,
    groups: RwLock<BTreeMap<String, Group>>,
    membership: Arc<ClusterMap>,
}

impl GroupManager {
    /// Create a manager with a membership map of its own.
    ///
    /// Only this manager sees the records. Use [`GroupManager::clustered`]
    /// to share membership with other nodes.
    #[must_use]
    pub fn new(local_node: Node) -> Self {
        Self::with_membership(local_node, Arc::new(ClusterMap::new(GROUPS_MAP_NAME)))
    }

    /// Create a manager whose membership is shared through `maps`.
    #[must_use]
    pub fn clustered(local_node: Node, maps: &dyn DistributedMaps) -> Self {
        Self::with_membership(local_node, maps.get_map(GROUPS_MAP_NAME))
    }

    /// The local node starts as a member of the default group only. A record
    /// left over from an earlier run under the same id is replaced.
    fn with_membership(local_node: Node, membership: Arc<ClusterMap>) -> Self {
        let mut record = NodeGroups::new(local_node.clone());
        record.groups.insert(DEFAULT_GROUP_NAME.to_string());
        if let Err(e) = membership.put(local_node.id().as_str(), &record) {
            warn!(node = %local_node.id(), error = %e, "Failed to publish membership record");
        }
        Self {
            local_node,
            groups: RwLock::new(BTreeMap::from([(
                DEFAULT_GROUP_NAME.to_string(),
                Group::new(DEFAULT_GROUP_NAME),
            )])),
            membership,
        }
    }

    #[must_use]
    pub fn local_node(&self) -> &Node {
        &self.local_node
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Snapshot of every group, ordered by name. Always contains `default`.
    #[must_use]
    pub fn list_groups(&self) -> BTreeMap<String, Group> {
        let records = self.records();
        let mut groups = self.groups.read().clone();
        for record in &records {
            for name in &record.groups {
                if !groups.contains_key(name) {
                    let group = materialize(&groups, name);
                    groups.insert(name.clone(), group);
                }
            }
        }
        for record in records {
            for name in &record.groups {
                if let Some(group) = groups.get_mut(name) {
                    group.add_member(record.node.clone());
                }
            }
        }
        groups
    }

    #[must_use]
    pub fn find_group_by_name(&self, name: &str) -> Option<Group> {
        let records = self.records();
        let mut group = {
            let groups = self.groups.read();
            match groups.get(name) {
                Some(group) => group.clone(),
                None if records.iter().any(|r| r.contains(name)) => materialize(&groups, name),
                None => return None,
            }
        };
        for record in records.into_iter().filter(|r| r.contains(name)) {
            group.add_member(record.node);
        }
        Some(group)
    }

    /// Groups the local node belongs to.
    #[must_use]
    pub fn list_local_groups(&self) -> Vec<Group> {
        self.list_groups_for(self.local_node.id())
    }

    #[must_use]
    pub fn is_local_group(&self, name: &str) -> bool {
        self.record(self.local_node.id())
            .is_some_and(|record| record.contains(name))
    }

    /// Groups `node` belongs to.
    #[must_use]
    pub fn list_groups_for(&self, node: &NodeId) -> Vec<Group> {
        self.list_groups()
            .into_values()
            .filter(|g| g.contains(node))
            .collect()
    }

    /// Names of the groups `node` belongs to.
    #[must_use]
    pub fn list_group_names(&self, node: &NodeId) -> BTreeSet<String> {
        self.record(node).map(|r| r.groups).unwrap_or_default()
    }

    /// Every node holding a membership record, ordered by id.
    #[must_use]
    pub fn list_nodes(&self) -> BTreeSet<Node> {
        self.records().into_iter().map(|r| r.node).collect()
    }

    pub fn members(&self, name: &str) -> Result<BTreeSet<Node>, GroupError> {
        self.find_group_by_name(name)
            .map(|g| g.members().clone())
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }

    // =========================================================================
    // GROUP LIFECYCLE
    // =========================================================================

    /// Create an empty group that starts with the default group's policy.
    pub fn create_group(&self, name: &str) -> Result<Group, GroupError> {
        validate_name(name)?;
        let mut groups = self.groups.write();
        if groups.contains_key(name) || self.named_by_record(name) {
            return Err(GroupError::AlreadyExists(name.to_string()));
        }

        let group = materialize(&groups, name);
        groups.insert(name.to_string(), group.clone());
        info!(group = name, "Group created");
        Ok(group)
    }

    /// Delete a group and withdraw every node from it. The default group is
    /// protected.
    pub fn delete_group(&self, name: &str) -> Result<Group, GroupError> {
        if name == DEFAULT_GROUP_NAME {
            return Err(GroupError::DefaultGroupProtected);
        }
        let removed = self
            .find_group_by_name(name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))?;
        self.groups.write().remove(name);

        for member in removed.members() {
            self.update_record(member.id(), None, |groups| {
                groups.remove(name);
            })?;
        }
        if !removed.members().is_empty() {
            warn!(
                group = name,
                members = removed.members().len(),
                "Deleted group still had members"
            );
        }
        info!(group = name, "Group deleted");
        Ok(removed)
    }

    /// Create or update a group from its declarative form.
    pub fn apply_definition(&self, definition: &GroupDefinition) -> Result<(), GroupError> {
        validate_name(&definition.name)?;
        let mut groups = self.groups.write();
        if let Some(parent) = &definition.parent {
            check_parent(&groups, &definition.name, parent)?;
        }
        let group = groups
            .entry(definition.name.clone())
            .or_insert_with(|| Group::new(definition.name.clone()));
        definition.apply_to(group);
        group.set_parent(definition.parent.clone());
        debug!(
            group = %definition.name,
            categories = definition.categories.len(),
            "Group definition applied"
        );
        Ok(())
    }

    /// Set or clear the group `name` inherits lists from.
    pub fn set_parent(&self, name: &str, parent: Option<&str>) -> Result<(), GroupError> {
        let mut groups = self.groups.write();
        if let Some(parent) = parent {
            check_parent(&groups, name, parent)?;
        }
        self.known_group(&mut groups, name)?
            .set_parent(parent.map(str::to_string));
        Ok(())
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Make the local node a member of `name`, creating the group if needed.
    pub fn register_group(&self, name: &str) -> Result<Group, GroupError> {
        if self.find_group_by_name(name).is_none() {
            match self.create_group(name) {
                Ok(_) | Err(GroupError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.join(name, self.local_node.clone())?;
        self.find_group_by_name(name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }

    /// Remove the local node from `name`.
    pub fn unregister_group(&self, name: &str) -> Result<(), GroupError> {
        let id = self.local_node.id().clone();
        self.leave(name, &id).map(|_| ())
    }

    /// Record that `node` joined `group`.
    pub fn join(&self, group: &str, node: Node) -> Result<(), GroupError> {
        if !self.groups.read().contains_key(group) && !self.named_by_record(group) {
            return Err(GroupError::NotFound(group.to_string()));
        }
        let node_id = node.id().clone();
        let mut fresh = false;
        self.update_record(&node_id, Some(node), |groups| {
            fresh = groups.insert(group.to_string());
        })?;
        if fresh {
            info!(group = group, node = %node_id, "Node joined group");
        }
        Ok(())
    }

    /// Record that `node` left `group`. Returns false if it was not a member.
    pub fn leave(&self, group: &str, node: &NodeId) -> Result<bool, GroupError> {
        if !self.groups.read().contains_key(group) && !self.named_by_record(group) {
            return Err(GroupError::NotFound(group.to_string()));
        }
        let mut removed = false;
        self.update_record(node, None, |groups| {
            removed = groups.remove(group);
        })?;
        if removed {
            info!(group = group, node = %node, "Node left group");
        }
        Ok(removed)
    }

    /// Drop the membership record of `node` after it left the cluster.
    ///
    /// Returns the number of groups it was removed from.
    pub fn node_left(&self, node: &NodeId) -> usize {
        let mut removed = 0;
        let result = self.membership.compute::<NodeGroups, _>(node.as_str(), |record| {
            removed = record.map_or(0, |r| r.groups.len());
            None
        });
        if let Err(e) = result {
            warn!(node = %node, error = %e, "Failed to drop membership record");
            // An unreadable record is dropped all the same
            self.membership.remove(node.as_str());
        }
        debug!(node = %node, groups = removed, "Node removed from cluster groups");
        removed
    }

    // =========================================================================
    // POLICY
    // =========================================================================

    /// Replace one list of a group.
    pub fn set_list<I, S>(
        &self,
        group: &str,
        list: ListType,
        category: &str,
        direction: EventType,
        patterns: I,
    ) -> Result<(), GroupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups = self.groups.write();
        self.known_group(&mut groups, group)?
            .tables_mut()
            .set_patterns(list, category, direction, patterns);
        debug!(group, %list, category, %direction, "Filter list replaced");
        Ok(())
    }

    /// Add `entry` to a list if absent, remove it if present.
    ///
    /// Returns true when the entry is in the list afterwards.
    pub fn toggle_list_entry(
        &self,
        group: &str,
        list: ListType,
        category: &str,
        direction: EventType,
        entry: &str,
    ) -> Result<bool, GroupError> {
        let mut groups = self.groups.write();
        let present = self
            .known_group(&mut groups, group)?
            .tables_mut()
            .toggle(list, category, direction, entry);
        debug!(group, %list, category, %direction, entry, present, "Filter list entry toggled");
        Ok(present)
    }

    /// Patterns for a category, unioned along the parent chain.
    pub fn resolve_list(
        &self,
        group: &str,
        list: ListType,
        category: &str,
        direction: EventType,
    ) -> Result<BTreeSet<String>, GroupError> {
        let groups = self.list_groups();
        if !groups.contains_key(group) {
            return Err(GroupError::NotFound(group.to_string()));
        }

        let mut resolved = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut current = Some(group);
        while let Some(name) = current {
            if !visited.insert(name) {
                break;
            }
            let Some(g) = groups.get(name) else {
                debug!(group, parent = name, "Parent group missing, stopping inheritance");
                break;
            };
            if let Some(patterns) = g.tables().patterns(list, category, direction) {
                resolved.extend(patterns.iter().cloned());
            }
            current = g.parent();
        }
        Ok(resolved)
    }

    pub fn set_sync(&self, group: &str, category: &str, enabled: bool) -> Result<(), GroupError> {
        let mut groups = self.groups.write();
        self.known_group(&mut groups, group)?
            .set_sync(category, enabled);
        Ok(())
    }

    // =========================================================================
    // MEMBERSHIP RECORDS
    // =========================================================================

    /// Decoded records of every node. Unreadable records are skipped.
    fn records(&self) -> Vec<NodeGroups> {
        self.membership
            .keys()
            .into_iter()
            .filter_map(|key| match self.membership.get::<NodeGroups>(&key) {
                Ok(record) => record,
                Err(e) => {
                    warn!(node = %key, error = %e, "Skipping unreadable membership record");
                    None
                }
            })
            .collect()
    }

    fn record(&self, node: &NodeId) -> Option<NodeGroups> {
        self.membership.get(node.as_str()).ok().flatten()
    }

    fn named_by_record(&self, group: &str) -> bool {
        self.records().iter().any(|r| r.contains(group))
    }

    /// Apply `edit` to the group names of `node` in one atomic step.
    ///
    /// `node` supplies the address when the record does not exist yet, and
    /// replaces the stored one when it does. A record left with no group is
    /// removed.
    fn update_record<F>(&self, id: &NodeId, node: Option<Node>, edit: F) -> Result<(), GroupError>
    where
        F: FnOnce(&mut BTreeSet<String>),
    {
        self.membership
            .compute::<NodeGroups, _>(id.as_str(), |current| {
                let mut record = match (current, node) {
                    (Some(mut record), Some(node)) => {
                        record.node = node;
                        record
                    }
                    (Some(record), None) => record,
                    (None, Some(node)) => NodeGroups::new(node),
                    (None, None) => return None,
                };
                edit(&mut record.groups);
                (!record.groups.is_empty()).then_some(record)
            })
            .map(|_| ())
            .map_err(|e| membership_error(id, &e))
    }

    /// Mutable policy of `name`, adopting it from the membership records if
    /// it is not held locally yet.
    fn known_group<'a>(
        &self,
        groups: &'a mut BTreeMap<String, Group>,
        name: &str,
    ) -> Result<&'a mut Group, GroupError> {
        if !groups.contains_key(name) {
            if !self.named_by_record(name) {
                return Err(GroupError::NotFound(name.to_string()));
            }
            let group = materialize(groups, name);
            groups.insert(name.to_string(), group);
        }
        groups
            .get_mut(name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }
}

/// A fresh group carrying the default group's policy.
fn materialize(groups: &BTreeMap<String, Group>, name: &str) -> Group {
    let mut group = Group::new(name);
    if let Some(default_group) = groups.get(DEFAULT_GROUP_NAME) {
        group.copy_policy_from(default_group);
    }
    group
}

fn membership_error(node: &NodeId, error: &MapError) -> GroupError {
    GroupError::Membership {
        node: node.to_string(),
        reason: error.to_string(),
    }
}

fn validate_name(name: &str) -> Result<(), GroupError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(GroupError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Reject `parent` if following its chain leads back to `group`.
fn check_parent(
    groups: &BTreeMap<String, Group>,
    group: &str,
    parent: &str,
) -> Result<(), GroupError> {
    let mut visited = BTreeSet::new();
    let mut current = Some(parent);
    while let Some(name) = current {
        if name == group || !visited.insert(name) {
            return Err(GroupError::ParentCycle {
                group: group.to_string(),
                parent: parent.to_string(),
            });
        }
        current = groups.get(name).and_then(Group::parent);
    }
    Ok(())
}

impl GroupDirectory for GroupManager {
    fn local_node(&self) -> Node {
        self.local_node.clone()
    }

    fn find_group_by_name(&self, name: &str) -> Option<Group> {
        GroupManager::find_group_by_name(self, name)
    }

    fn members(&self, group: &str) -> Option<BTreeSet<Node>> {
        GroupManager::members(self, group).ok()
    }

    fn resolve_list(
        &self,
        group: &str,
        list: ListType,
        category: &str,
        direction: EventType,
    ) -> Option<BTreeSet<String>> {
        GroupManager::resolve_list(self, group, list, category, direction).ok()
    }

    fn list_local_groups(&self) -> Vec<Group> {
        GroupManager::list_local_groups(self)
    }

    fn is_sync_enabled(&self, group: &str, category: &str) -> bool {
        GroupManager::find_group_by_name(self, group).is_some_and(|g| g.is_sync_enabled(category))
    }
}

impl GroupMembership for GroupManager {
    fn register_group(&self, name: &str) -> Result<Group, GroupError> {
        GroupManager::register_group(self, name)
    }

    fn unregister_group(&self, name: &str) -> Result<(), GroupError> {
        GroupManager::unregister_group(self, name)
    }

    fn list_local_group_names(&self) -> BTreeSet<String> {
        self.list_group_names(self.local_node.id())
    }
}
