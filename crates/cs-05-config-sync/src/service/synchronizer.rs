//! # Configuration Synchronizer
//!
//! Moves configurations between the local store and the cluster maps of
//! the node's groups.
//!
//! | Operation | Direction | Policy checked |
//! |-----------|-----------|----------------|
//! | `pull(group)` | cluster map → local store | inbound |
//! | `push(group)` | local store → cluster map, plus an event per change | outbound |
//! | `on_local_change(pid)` | one local configuration → every local group | outbound |
//! | `on_local_delete(pid)` | removal → every local group | outbound |

use crate::domain::{
    configuration_map_name, filter_properties, merge_for_pull, properties_equal, ConfigSyncError,
    Properties,
};
use crate::ports::ConfigurationStore;
use cs_01_groups::GroupDirectory;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventProducer;
use shared_bus::{ChangeType, ClusterEvent, DistributedMaps, CONFIGURATION_CATEGORY};
use shared_types::{EventType, SyncSummary};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Synchronizes the local configuration store with the cluster.
pub struct ConfigurationSynchronizer {
    groups: Arc<dyn GroupDirectory>,
    store: Arc<dyn ConfigurationStore>,
    maps: Arc<dyn DistributedMaps>,
    filter: Arc<dyn ResourceFilter>,
    producer: Arc<dyn EventProducer>,
}

impl ConfigurationSynchronizer {
    #[must_use]
    pub fn new(
        groups: Arc<dyn GroupDirectory>,
        store: Arc<dyn ConfigurationStore>,
        maps: Arc<dyn DistributedMaps>,
        filter: Arc<dyn ResourceFilter>,
        producer: Arc<dyn EventProducer>,
    ) -> Self {
        Self {
            groups,
            store,
            maps,
            filter,
            producer,
        }
    }

    /// True when configurations of `group` are synchronized.
    #[must_use]
    pub fn is_sync_enabled(&self, group: &str) -> bool {
        self.groups.is_sync_enabled(group, CONFIGURATION_CATEGORY)
    }

    fn allowed(&self, group: &str, pid: &str, direction: EventType) -> bool {
        self.filter
            .is_allowed(group, CONFIGURATION_CATEGORY, pid, direction)
    }

    fn ensure_group(&self, group: &str) -> Result<(), ConfigSyncError> {
        self.groups
            .find_group_by_name(group)
            .map(|_| ())
            .ok_or_else(|| ConfigSyncError::GroupNotFound(group.to_string()))
    }

    /// Apply the cluster copy of every allowed configuration of `group`.
    ///
    /// Returns the number of local configurations changed.
    ///
    /// # Errors
    ///
    /// Unknown group, or an undecodable map entry.
    pub fn pull(&self, group: &str) -> Result<usize, ConfigSyncError> {
        self.ensure_group(group)?;
        let map = self.maps.get_map(&configuration_map_name(group));

        let mut changed = 0;
        for pid in map.keys() {
            if !self.allowed(group, &pid, EventType::Inbound) {
                debug!(group, pid = %pid, "Configuration blocked inbound");
                continue;
            }
            let Some(cluster) = map.get::<Properties>(&pid)? else {
                continue;
            };
            let local = self.store.get(&pid);
            if !properties_equal(local.as_ref(), Some(&cluster)) {
                self.store.update(&pid, merge_for_pull(local.as_ref(), &cluster));
                changed += 1;
            }
        }
        if changed > 0 {
            info!(group, changed, "Pulled configurations from cluster");
        }
        Ok(changed)
    }

    /// Publish every allowed local configuration that differs from the
    /// cluster copy of `group`.
    ///
    /// Returns the number of configurations published.
    ///
    /// # Errors
    ///
    /// Unknown group, or a map entry that cannot be read or written.
    pub fn push(&self, group: &str) -> Result<usize, ConfigSyncError> {
        self.ensure_group(group)?;
        let mut pushed = 0;
        for pid in self.store.list_pids() {
            if self.publish(group, &pid)? {
                pushed += 1;
            }
        }
        if pushed > 0 {
            info!(group, pushed, "Pushed configurations to cluster");
        }
        Ok(pushed)
    }

    /// Pull then push every local group with synchronization enabled.
    ///
    /// # Errors
    ///
    /// The first failing group stops the pass.
    pub fn sync_all(&self) -> Result<SyncSummary, ConfigSyncError> {
        let mut summary = SyncSummary::default();
        for group in self.groups.list_local_groups() {
            let name = group.name();
            if !self.is_sync_enabled(name) {
                debug!(group = name, "Configuration sync disabled");
                continue;
            }
            summary.pulled += self.pull(name)?;
            summary.pushed += self.push(name)?;
            summary.groups += 1;
        }
        Ok(summary)
    }

    /// Propagate a local change of `pid` to every local group.
    ///
    /// Returns the number of groups the change was published to.
    ///
    /// # Errors
    ///
    /// A map entry that cannot be read or written.
    pub fn on_local_change(&self, pid: &str) -> Result<usize, ConfigSyncError> {
        if !self.producer.switch().is_on() {
            warn!(pid, "Producer switched off, local configuration change not propagated");
            return Ok(0);
        }
        let mut published = 0;
        for group in self.groups.list_local_groups() {
            if self.publish(group.name(), pid)? {
                published += 1;
            }
        }
        Ok(published)
    }

    /// Propagate the local removal of `pid` to every local group.
    ///
    /// Returns the number of groups the removal was published to.
    pub fn on_local_delete(&self, pid: &str) -> usize {
        if !self.producer.switch().is_on() {
            warn!(pid, "Producer switched off, local configuration removal not propagated");
            return 0;
        }
        let mut published = 0;
        for group in self.groups.list_local_groups() {
            let name = group.name();
            if !self.allowed(name, pid, EventType::Outbound) {
                debug!(group = name, pid, "Configuration blocked outbound");
                continue;
            }
            let map = self.maps.get_map(&configuration_map_name(name));
            if !map.remove(pid) {
                continue;
            }
            let outcome = self
                .producer
                .produce(ClusterEvent::configuration(name, pid, ChangeType::Deleted));
            debug!(group = name, pid, ?outcome, "Configuration removal published");
            published += 1;
        }
        published
    }

    /// Write the local copy of `pid` into the map of `group` and announce
    /// it, if allowed and different. Returns true when announced.
    fn publish(&self, group: &str, pid: &str) -> Result<bool, ConfigSyncError> {
        if !self.allowed(group, pid, EventType::Outbound) {
            debug!(group, pid, "Configuration blocked outbound");
            return Ok(false);
        }
        let Some(local) = self.store.get(pid) else {
            return Ok(false);
        };

        let map = self.maps.get_map(&configuration_map_name(group));
        let cluster: Option<Properties> = map.get(pid)?;
        if properties_equal(Some(&local), cluster.as_ref()) {
            return Ok(false);
        }

        map.put(pid, &filter_properties(&local))?;
        let outcome = self
            .producer
            .produce(ClusterEvent::configuration(group, pid, ChangeType::Updated));
        debug!(group, pid, ?outcome, "Configuration published");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryConfigurationStore;
    use cs_01_groups::{GroupManager, ListType};
    use cs_02_filtering::FilteringEngine;
    use cs_03_dispatch::BusProducer;
    use shared_bus::{EventFilter, EventPayload, EventTransport, InMemoryEventBus, InMemoryMaps};
    use shared_types::{Node, DEFAULT_GROUP_NAME};

    struct Fixture {
        bus: Arc<InMemoryEventBus>,
        groups: Arc<GroupManager>,
        store: Arc<InMemoryConfigurationStore>,
        maps: Arc<InMemoryMaps>,
        producer: Arc<BusProducer>,
        sync: ConfigurationSynchronizer,
    }

    fn fixture() -> Fixture {
        let local = Node::new("node-a", "localhost", 5701);
        let bus = Arc::new(InMemoryEventBus::new());
        let groups = Arc::new(GroupManager::new(local.clone()));
        let store = Arc::new(InMemoryConfigurationStore::new());
        let maps = Arc::new(InMemoryMaps::new());
        let filter = Arc::new(FilteringEngine::new(groups.clone()));
        let producer = Arc::new(BusProducer::new(bus.clone(), local, filter.clone()));
        let sync = ConfigurationSynchronizer::new(
            groups.clone(),
            store.clone(),
            maps.clone(),
            filter,
            producer.clone(),
        );
        Fixture {
            bus,
            groups,
            store,
            maps,
            producer,
            sync,
        }
    }

    fn props(entries: &[(&str, &str)]) -> Properties {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cluster_copy(f: &Fixture, group: &str, pid: &str) -> Option<Properties> {
        f.maps
            .get_map(&configuration_map_name(group))
            .get(pid)
            .unwrap()
    }

    #[tokio::test]
    async fn test_push_writes_map_and_announces() {
        let f = fixture();
        let mut sub = f.bus.subscribe(EventFilter::all());
        f.store
            .update("org.acme", props(&[("service.pid", "org.acme"), ("port", "8080")]));

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 1);
        assert_eq!(
            cluster_copy(&f, DEFAULT_GROUP_NAME, "org.acme"),
            Some(props(&[("port", "8080")]))
        );

        let event = sub.recv().await.unwrap();
        let EventPayload::Configuration(change) = event.payload else {
            panic!("expected a configuration event");
        };
        assert_eq!(change.pid, "org.acme");
        assert_eq!(event.source_group.as_deref(), Some(DEFAULT_GROUP_NAME));

        // Second push finds nothing new
        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 0);
    }

    #[test]
    fn test_push_respects_outbound_policy() {
        let f = fixture();
        f.groups
            .set_list(DEFAULT_GROUP_NAME, ListType::Blacklist, "config", EventType::Outbound, ["org.secret"])
            .unwrap();
        f.store.update("org.secret", props(&[("key", "hunter2")]));
        f.store.update("org.apache.karaf.shell", props(&[("sshPort", "8101")]));

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 0);
        assert!(cluster_copy(&f, DEFAULT_GROUP_NAME, "org.secret").is_none());
        assert!(cluster_copy(&f, DEFAULT_GROUP_NAME, "org.apache.karaf.shell").is_none());
    }

    #[test]
    fn test_pull_applies_differences() {
        let f = fixture();
        let map = f.maps.get_map(&configuration_map_name(DEFAULT_GROUP_NAME));
        map.put("org.acme", &props(&[("port", "9090")])).unwrap();
        map.put("org.same", &props(&[("a", "1")])).unwrap();
        f.store.update("org.same", props(&[("a", "1")]));

        assert_eq!(f.sync.pull(DEFAULT_GROUP_NAME).unwrap(), 1);
        assert_eq!(f.store.get("org.acme"), Some(props(&[("port", "9090")])));
    }

    #[test]
    fn test_unknown_group() {
        let f = fixture();
        assert!(matches!(f.sync.pull("ghost"), Err(ConfigSyncError::GroupNotFound(_))));
        assert!(matches!(f.sync.push("ghost"), Err(ConfigSyncError::GroupNotFound(_))));
    }

    #[test]
    fn test_sync_all_skips_disabled_groups() {
        let f = fixture();
        f.groups.register_group("dev").unwrap();
        f.groups.set_sync("dev", "config", false).unwrap();
        f.store.update("org.acme", props(&[("port", "8080")]));

        let summary = f.sync.sync_all().unwrap();
        assert_eq!(summary.groups, 1);
        assert_eq!(summary.pushed, 1);
        assert!(cluster_copy(&f, "dev", "org.acme").is_none());
        assert!(!f.sync.is_sync_enabled("dev"));
    }

    #[test]
    fn test_local_change_reaches_every_local_group() {
        let f = fixture();
        f.groups.register_group("dev").unwrap();
        f.store.update("org.acme", props(&[("port", "8080")]));

        assert_eq!(f.sync.on_local_change("org.acme").unwrap(), 2);
        assert!(cluster_copy(&f, DEFAULT_GROUP_NAME, "org.acme").is_some());
        assert!(cluster_copy(&f, "dev", "org.acme").is_some());
        assert_eq!(f.bus.events_published(), 2);
    }

    #[test]
    fn test_local_change_with_producer_off() {
        let f = fixture();
        f.producer.switch().turn_off();
        f.store.update("org.acme", props(&[("port", "8080")]));

        assert_eq!(f.sync.on_local_change("org.acme").unwrap(), 0);
        assert!(cluster_copy(&f, DEFAULT_GROUP_NAME, "org.acme").is_none());
    }

    #[test]
    fn test_local_delete() {
        let f = fixture();
        f.store.update("org.acme", props(&[("port", "8080")]));
        f.sync.push(DEFAULT_GROUP_NAME).unwrap();

        f.store.delete("org.acme");
        assert_eq!(f.sync.on_local_delete("org.acme"), 1);
        assert!(cluster_copy(&f, DEFAULT_GROUP_NAME, "org.acme").is_none());
        // Nothing left to remove
        assert_eq!(f.sync.on_local_delete("org.acme"), 0);
    }
}
