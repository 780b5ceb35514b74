//! # Features Synchronizer
//!
//! Moves repositories and feature install state between the local
//! provisioning service and the cluster maps of the node's groups.
//!
//! A feature that is only available locally, never installed and unknown
//! to the cluster, is not published.

use crate::domain::{
    features_map_name, repositories_map_name, FeatureState, FeaturesSyncError,
};
use crate::ports::FeaturesService;
use cs_01_groups::GroupDirectory;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventProducer;
use shared_bus::{
    ClusterEvent, DistributedMaps, FeatureAction, FeatureChange, RepositoryAction,
    RepositoryChange, FEATURES_CATEGORY,
};
use shared_types::{EventType, SyncSummary};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Synchronizes local features with the cluster.
pub struct FeaturesSynchronizer {
    groups: Arc<dyn GroupDirectory>,
    service: Arc<dyn FeaturesService>,
    maps: Arc<dyn DistributedMaps>,
    filter: Arc<dyn ResourceFilter>,
    producer: Arc<dyn EventProducer>,
}

impl FeaturesSynchronizer {
    #[must_use]
    pub fn new(
        groups: Arc<dyn GroupDirectory>,
        service: Arc<dyn FeaturesService>,
        maps: Arc<dyn DistributedMaps>,
        filter: Arc<dyn ResourceFilter>,
        producer: Arc<dyn EventProducer>,
    ) -> Self {
        Self {
            groups,
            service,
            maps,
            filter,
            producer,
        }
    }

    #[must_use]
    pub fn is_sync_enabled(&self, group: &str) -> bool {
        self.groups.is_sync_enabled(group, FEATURES_CATEGORY)
    }

    fn allowed(&self, group: &str, name: &str, direction: EventType) -> bool {
        self.filter
            .is_allowed(group, FEATURES_CATEGORY, name, direction)
    }

    fn ensure_group(&self, group: &str) -> Result<(), FeaturesSyncError> {
        self.groups
            .find_group_by_name(group)
            .map(|_| ())
            .ok_or_else(|| FeaturesSyncError::GroupNotFound(group.to_string()))
    }

    /// Register the cluster's repositories, then install or uninstall
    /// allowed features to match the cluster flags of `group`.
    ///
    /// Individual install failures are logged and skipped. Returns the
    /// number of local changes.
    ///
    /// # Errors
    ///
    /// Unknown group, or an undecodable map entry.
    pub fn pull(&self, group: &str) -> Result<usize, FeaturesSyncError> {
        self.ensure_group(group)?;
        let mut changed = 0;

        let local_repositories = self.service.list_repositories();
        for url in self.maps.get_map(&repositories_map_name(group)).keys() {
            if local_repositories.contains(&url) {
                continue;
            }
            match self.service.add_repository(&url) {
                Ok(()) => changed += 1,
                Err(e) => warn!(group, url = %url, error = %e, "Feature repository not added"),
            }
        }

        let map = self.maps.get_map(&features_map_name(group));
        for (id, cluster) in map.entries::<FeatureState>()? {
            if !self.allowed(group, &cluster.name, EventType::Inbound) {
                debug!(group, feature = %id, "Feature blocked inbound");
                continue;
            }
            let version = Some(cluster.version.as_str());
            let local = self.service.is_installed(&cluster.name, version);
            if cluster.installed && !local {
                match self.service.install_feature(&cluster.name, version) {
                    Ok(()) => changed += 1,
                    Err(e) => warn!(group, feature = %id, error = %e, "Feature not installed"),
                }
            } else if !cluster.installed && local && self.service.uninstall_feature(&cluster.name, version)
            {
                changed += 1;
            }
        }
        if changed > 0 {
            info!(group, changed, "Pulled features from cluster");
        }
        Ok(changed)
    }

    /// Publish local repositories missing from the cluster, and every
    /// allowed feature whose install state differs from the cluster copy.
    ///
    /// Returns the number of repositories and features published.
    ///
    /// # Errors
    ///
    /// Unknown group, or a map entry that cannot be read or written.
    pub fn push(&self, group: &str) -> Result<usize, FeaturesSyncError> {
        self.ensure_group(group)?;
        if !self.producer.switch().is_on() {
            warn!(group, "Producer switched off, features not pushed");
            return Ok(0);
        }
        let mut pushed = 0;
        for url in self.service.list_repositories() {
            if self.publish_repository(group, &url, RepositoryAction::Added) {
                pushed += 1;
            }
        }
        let map = self.maps.get_map(&features_map_name(group));
        for feature in self.service.list_features() {
            if !feature.installed && !map.contains_key(&feature.id()) {
                continue;
            }
            if self.publish_feature(group, &feature)? {
                pushed += 1;
            }
        }
        if pushed > 0 {
            info!(group, pushed, "Pushed features to cluster");
        }
        Ok(pushed)
    }

    /// Pull then push every local group with features sync enabled.
    ///
    /// # Errors
    ///
    /// The first failing group stops the pass.
    pub fn sync_all(&self) -> Result<SyncSummary, FeaturesSyncError> {
        let mut summary = SyncSummary::default();
        for group in self.groups.list_local_groups() {
            let name = group.name();
            if !self.is_sync_enabled(name) {
                debug!(group = name, "Features sync disabled");
                continue;
            }
            summary.pulled += self.pull(name)?;
            summary.pushed += self.push(name)?;
            summary.groups += 1;
        }
        Ok(summary)
    }

    /// Propagate a local install or uninstall to every local group.
    ///
    /// Returns the number of groups the change reached.
    ///
    /// # Errors
    ///
    /// A map entry that cannot be read or written.
    pub fn on_feature_change(&self, feature: &FeatureState) -> Result<usize, FeaturesSyncError> {
        if !self.producer.switch().is_on() {
            warn!(feature = %feature.id(), "Producer switched off, local feature change not propagated");
            return Ok(0);
        }
        let mut published = 0;
        for group in self.groups.list_local_groups() {
            if self.publish_feature(group.name(), feature)? {
                published += 1;
            }
        }
        Ok(published)
    }

    /// Propagate a local repository change to every local group.
    pub fn on_repository_change(&self, url: &str, action: RepositoryAction) -> usize {
        if !self.producer.switch().is_on() {
            warn!(url, "Producer switched off, local repository change not propagated");
            return 0;
        }
        self.groups
            .list_local_groups()
            .iter()
            .filter(|group| self.publish_repository(group.name(), url, action))
            .count()
    }

    fn publish_feature(&self, group: &str, feature: &FeatureState) -> Result<bool, FeaturesSyncError> {
        if !self.allowed(group, &feature.name, EventType::Outbound) {
            debug!(group, feature = %feature.id(), "Feature blocked outbound");
            return Ok(false);
        }
        let id = feature.id();
        let map = self.maps.get_map(&features_map_name(group));
        let cluster: Option<FeatureState> = map.get(&id)?;
        if cluster.is_some_and(|c| c.installed == feature.installed) {
            return Ok(false);
        }
        map.put(&id, feature)?;

        let action = if feature.installed {
            FeatureAction::Installed
        } else {
            FeatureAction::Uninstalled
        };
        let outcome = self.producer.produce(ClusterEvent::feature(
            group,
            FeatureChange {
                name: feature.name.clone(),
                version: Some(feature.version.clone()),
                action,
            },
        ));
        debug!(group, feature = %id, ?action, ?outcome, "Feature change published");
        Ok(true)
    }

    fn publish_repository(&self, group: &str, url: &str, action: RepositoryAction) -> bool {
        let map = self.maps.get_map(&repositories_map_name(group));
        let changed = match action {
            RepositoryAction::Added => {
                let mut added = false;
                let written = map.compute::<String, _>(url, |current| {
                    added = current.is_none();
                    Some(current.unwrap_or_else(|| url.to_string()))
                });
                if let Err(e) = written {
                    warn!(group, url, error = %e, "Feature repository not recorded");
                }
                added
            }
            RepositoryAction::Removed => map.remove(url),
        };
        if !changed {
            return false;
        }
        let outcome = self.producer.produce(ClusterEvent::repository(
            group,
            RepositoryChange {
                url: url.to_string(),
                action,
            },
        ));
        debug!(group, url, ?action, ?outcome, "Feature repository change published");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryFeaturesService;
    use cs_01_groups::{GroupManager, ListType};
    use cs_03_dispatch::BusProducer;
    use cs_02_filtering::FilteringEngine;
    use shared_bus::{EventFilter, EventPayload, EventTransport, InMemoryEventBus, InMemoryMaps};
    use shared_types::{Node, DEFAULT_GROUP_NAME};

    const REPO: &str = "mvn:org.acme/features/1.0/xml/features";

    struct Fixture {
        bus: Arc<InMemoryEventBus>,
        groups: Arc<GroupManager>,
        service: Arc<InMemoryFeaturesService>,
        maps: Arc<InMemoryMaps>,
        producer: Arc<BusProducer>,
        sync: FeaturesSynchronizer,
    }

    fn fixture() -> Fixture {
        let local = Node::new("node-a", "localhost", 5701);
        let bus = Arc::new(InMemoryEventBus::new());
        let groups = Arc::new(GroupManager::new(local.clone()));
        let service = Arc::new(InMemoryFeaturesService::new());
        let maps = Arc::new(InMemoryMaps::new());
        let filter = Arc::new(FilteringEngine::new(groups.clone()));
        let producer = Arc::new(BusProducer::new(bus.clone(), local, filter.clone()));
        let sync = FeaturesSynchronizer::new(
            groups.clone(),
            service.clone(),
            maps.clone(),
            filter,
            producer.clone(),
        );
        Fixture {
            bus,
            groups,
            service,
            maps,
            producer,
            sync,
        }
    }

    fn cluster(f: &Fixture, id: &str) -> Option<FeatureState> {
        f.maps
            .get_map(&features_map_name(DEFAULT_GROUP_NAME))
            .get(id)
            .unwrap()
    }

    fn seed(f: &Fixture, feature: &FeatureState) {
        f.maps
            .get_map(&features_map_name(DEFAULT_GROUP_NAME))
            .put(&feature.id(), feature)
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_publishes_installed_features_only() {
        let f = fixture();
        let mut sub = f.bus.subscribe(EventFilter::all());
        f.service.provide("webconsole", "4.2.0");
        f.service.provide("scheduler", "4.2.0");
        f.service.install_feature("webconsole", None).unwrap();

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 1);
        assert!(cluster(&f, "webconsole/4.2.0").unwrap().installed);
        assert!(cluster(&f, "scheduler/4.2.0").is_none());

        let event = sub.recv().await.unwrap();
        let EventPayload::Feature(change) = event.payload else {
            panic!("expected a feature event");
        };
        assert_eq!(change.action, FeatureAction::Installed);
        assert_eq!(change.version.as_deref(), Some("4.2.0"));

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 0);
    }

    #[test]
    fn test_push_records_uninstall_of_known_feature() {
        let f = fixture();
        f.service.provide("webconsole", "4.2.0");
        seed(&f, &FeatureState::new("webconsole", "4.2.0", true));

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 1);
        assert!(!cluster(&f, "webconsole/4.2.0").unwrap().installed);
    }

    #[test]
    fn test_push_publishes_repositories_once() {
        let f = fixture();
        f.service.add_repository(REPO).unwrap();

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 1);
        let repositories = f.maps.get_map(&repositories_map_name(DEFAULT_GROUP_NAME));
        assert_eq!(repositories.keys(), vec![REPO.to_string()]);
        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 0);
    }

    #[test]
    fn test_pull_adds_repositories_and_installs() {
        let f = fixture();
        f.service.provide("webconsole", "4.2.0");
        f.maps
            .get_map(&repositories_map_name(DEFAULT_GROUP_NAME))
            .put(REPO, &REPO)
            .unwrap();
        seed(&f, &FeatureState::new("webconsole", "4.2.0", true));

        assert_eq!(f.sync.pull(DEFAULT_GROUP_NAME).unwrap(), 2);
        assert!(f.service.list_repositories().contains(&REPO.to_string()));
        assert!(f.service.is_installed("webconsole", Some("4.2.0")));
    }

    #[test]
    fn test_pull_uninstalls_feature_flagged_off() {
        let f = fixture();
        f.service.provide("webconsole", "4.2.0");
        f.service.install_feature("webconsole", None).unwrap();
        seed(&f, &FeatureState::new("webconsole", "4.2.0", false));

        assert_eq!(f.sync.pull(DEFAULT_GROUP_NAME).unwrap(), 1);
        assert!(!f.service.is_installed("webconsole", None));
    }

    #[test]
    fn test_pull_skips_unknown_feature() {
        let f = fixture();
        seed(&f, &FeatureState::new("ghost", "1.0", true));
        assert_eq!(f.sync.pull(DEFAULT_GROUP_NAME).unwrap(), 0);
    }

    #[test]
    fn test_pull_respects_inbound_policy() {
        let f = fixture();
        f.groups
            .set_list(DEFAULT_GROUP_NAME, ListType::Blacklist, FEATURES_CATEGORY, EventType::Inbound, ["web*"])
            .unwrap();
        f.service.provide("webconsole", "4.2.0");
        seed(&f, &FeatureState::new("webconsole", "4.2.0", true));

        assert_eq!(f.sync.pull(DEFAULT_GROUP_NAME).unwrap(), 0);
        assert!(!f.service.is_installed("webconsole", None));
    }

    #[test]
    fn test_unknown_group() {
        let f = fixture();
        assert!(matches!(
            f.sync.pull("nope"),
            Err(FeaturesSyncError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_local_changes_reach_every_group() {
        let f = fixture();
        f.groups.register_group("dev").unwrap();

        let feature = FeatureState::new("webconsole", "4.2.0", true);
        assert_eq!(f.sync.on_feature_change(&feature).unwrap(), 2);
        assert_eq!(f.sync.on_repository_change(REPO, RepositoryAction::Added), 2);
        assert_eq!(f.sync.on_repository_change(REPO, RepositoryAction::Removed), 2);
        assert!(f.maps.get_map(&repositories_map_name("dev")).is_empty());
        assert!(f
            .maps
            .get_map(&features_map_name("dev"))
            .contains_key("webconsole/4.2.0"));
    }

    #[test]
    fn test_switched_off_producer_blocks_propagation() {
        let f = fixture();
        f.producer.switch().turn_off();
        f.service.add_repository(REPO).unwrap();

        assert_eq!(f.sync.push(DEFAULT_GROUP_NAME).unwrap(), 0);
        assert_eq!(f.sync.on_repository_change(REPO, RepositoryAction::Added), 0);
    }

    #[test]
    fn test_sync_all_skips_disabled_groups() {
        let f = fixture();
        f.groups.register_group("dev").unwrap();
        f.groups.set_sync("dev", FEATURES_CATEGORY, false).unwrap();
        f.service.add_repository(REPO).unwrap();

        let summary = f.sync.sync_all().unwrap();
        assert_eq!(summary.groups, 1);
        assert_eq!(summary.pushed, 1);
    }
}
