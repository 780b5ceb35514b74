//! # Bundle Synchronizer
//!
//! Moves bundle state between the local framework and the cluster maps of
//! the node's groups.
//!
//! | Operation | Direction | Policy checked |
//! |-----------|-----------|----------------|
//! | `pull(group)` | cluster map → local framework | inbound |
//! | `push(group)` | local framework → cluster map, plus an event per change | outbound |
//! | `on_local_change(bundle, action)` | one local change → every local group | outbound |
//!
//! A push also drops cluster entries for bundles this node no longer has,
//! so `sync_all` pulls first.

use crate::domain::{bundle_map_name, BundleInfo, BundleState, BundleSyncError};
use crate::ports::BundleRuntime;
use cs_01_groups::GroupDirectory;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventProducer;
use shared_bus::{BundleAction, BundleChange, ClusterEvent, DistributedMaps, BUNDLE_CATEGORY};
use shared_types::{EventType, SyncSummary};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Synchronizes the local bundles with the cluster.
pub struct BundleSynchronizer {
    groups: Arc<dyn GroupDirectory>,
    runtime: Arc<dyn BundleRuntime>,
    maps: Arc<dyn DistributedMaps>,
    filter: Arc<dyn ResourceFilter>,
    producer: Arc<dyn EventProducer>,
}

impl BundleSynchronizer {
    #[must_use]
    pub fn new(
        groups: Arc<dyn GroupDirectory>,
        runtime: Arc<dyn BundleRuntime>,
        maps: Arc<dyn DistributedMaps>,
        filter: Arc<dyn ResourceFilter>,
        producer: Arc<dyn EventProducer>,
    ) -> Self {
        Self {
            groups,
            runtime,
            maps,
            filter,
            producer,
        }
    }

    #[must_use]
    pub fn is_sync_enabled(&self, group: &str) -> bool {
        self.groups.is_sync_enabled(group, BUNDLE_CATEGORY)
    }

    fn allowed(&self, group: &str, location: &str, direction: EventType) -> bool {
        self.filter
            .is_allowed(group, BUNDLE_CATEGORY, location, direction)
    }

    fn ensure_group(&self, group: &str) -> Result<(), BundleSyncError> {
        self.groups
            .find_group_by_name(group)
            .map(|_| ())
            .ok_or_else(|| BundleSyncError::GroupNotFound(group.to_string()))
    }

    /// Bring local bundles to the state recorded for `group`.
    ///
    /// Every missing bundle is installed before any is started, so a bundle
    /// depending on another one of the same pull still starts. A bundle
    /// that fails to start is logged and skipped.
    ///
    /// Returns the number of local bundles changed.
    ///
    /// # Errors
    ///
    /// Unknown group, an undecodable map entry, or a failed install.
    pub fn pull(&self, group: &str) -> Result<usize, BundleSyncError> {
        self.ensure_group(group)?;
        let map = self.maps.get_map(&bundle_map_name(group));

        let mut changed = 0;
        let mut to_start = Vec::new();
        for (id, cluster) in map.entries::<BundleInfo>()? {
            if !self.allowed(group, &cluster.location, EventType::Inbound) {
                debug!(group, bundle = %id, "Bundle blocked inbound");
                continue;
            }
            let local = self.runtime.get(&id);
            if local.is_none() {
                self.runtime.install(&cluster)?;
                debug!(group, bundle = %id, "Bundle installed from cluster");
                changed += 1;
            }
            let local_state = local.map_or(BundleState::Installed, |b| b.state);
            match cluster.state {
                BundleState::Active if local_state != BundleState::Active => to_start.push(id),
                BundleState::Resolved if local_state == BundleState::Active => {
                    self.runtime.stop(&id)?;
                    changed += 1;
                }
                _ => {}
            }
        }

        for id in to_start {
            match self.runtime.start(&id) {
                Ok(()) => changed += 1,
                Err(e) => warn!(group, bundle = %id, error = %e, "Bundle not started"),
            }
        }
        if changed > 0 {
            info!(group, changed, "Pulled bundles from cluster");
        }
        Ok(changed)
    }

    /// Publish every allowed local bundle whose state differs from the
    /// cluster copy of `group`, then drop cluster entries of bundles this
    /// node does not have.
    ///
    /// Returns the number of bundles published.
    ///
    /// # Errors
    ///
    /// Unknown group, or a map entry that cannot be read or written.
    pub fn push(&self, group: &str) -> Result<usize, BundleSyncError> {
        self.ensure_group(group)?;
        if !self.producer.switch().is_on() {
            warn!(group, "Producer switched off, bundles not pushed");
            return Ok(0);
        }
        let map = self.maps.get_map(&bundle_map_name(group));

        let mut pushed = 0;
        for bundle in self.runtime.list() {
            if self.publish(group, &bundle, bundle.state.announced_as())? {
                pushed += 1;
            }
        }

        for (id, cluster) in map.entries::<BundleInfo>()? {
            if self.runtime.get(&id).is_none()
                && self.allowed(group, &cluster.location, EventType::Outbound)
            {
                map.remove(&id);
                debug!(group, bundle = %id, "Dropped cluster bundle missing locally");
            }
        }
        if pushed > 0 {
            info!(group, pushed, "Pushed bundles to cluster");
        }
        Ok(pushed)
    }

    /// Pull then push every local group with bundle sync enabled.
    ///
    /// # Errors
    ///
    /// The first failing group stops the pass.
    pub fn sync_all(&self) -> Result<SyncSummary, BundleSyncError> {
        let mut summary = SyncSummary::default();
        for group in self.groups.list_local_groups() {
            let name = group.name();
            if !self.is_sync_enabled(name) {
                debug!(group = name, "Bundle sync disabled");
                continue;
            }
            summary.pulled += self.pull(name)?;
            summary.pushed += self.push(name)?;
            summary.groups += 1;
        }
        Ok(summary)
    }

    /// Propagate a local bundle change to every local group.
    ///
    /// `bundle` describes the bundle after the change, or before it for
    /// `Uninstalled`. Returns the number of groups the change reached.
    ///
    /// # Errors
    ///
    /// A map entry that cannot be written.
    pub fn on_local_change(
        &self,
        bundle: &BundleInfo,
        action: BundleAction,
    ) -> Result<usize, BundleSyncError> {
        if !self.producer.switch().is_on() {
            warn!(bundle = %bundle.id(), "Producer switched off, local bundle change not propagated");
            return Ok(0);
        }
        let mut published = 0;
        for group in self.groups.list_local_groups() {
            if self.publish(group.name(), bundle, action)? {
                published += 1;
            }
        }
        Ok(published)
    }

    /// Record `bundle` in the map of `group` and announce `action`, if
    /// allowed and different. Returns true when announced.
    fn publish(
        &self,
        group: &str,
        bundle: &BundleInfo,
        action: BundleAction,
    ) -> Result<bool, BundleSyncError> {
        if !self.allowed(group, &bundle.location, EventType::Outbound) {
            debug!(group, location = %bundle.location, "Bundle blocked outbound");
            return Ok(false);
        }
        let id = bundle.id();
        let map = self.maps.get_map(&bundle_map_name(group));

        match action {
            BundleAction::Uninstalled => {
                if !map.remove(&id) {
                    return Ok(false);
                }
            }
            BundleAction::Updated => {}
            _ => {
                let state = BundleState::after(action).unwrap_or(bundle.state);
                let cluster: Option<BundleInfo> = map.get(&id)?;
                if cluster.is_some_and(|c| c.state == state) {
                    return Ok(false);
                }
                map.put(&id, &bundle.clone().with_state(state))?;
            }
        }

        let outcome = self.producer.produce(ClusterEvent::bundle(
            group,
            BundleChange {
                symbolic_name: bundle.symbolic_name.clone(),
                version: bundle.version.clone(),
                location: bundle.location.clone(),
                start_level: bundle.start_level,
                action,
            },
        ));
        debug!(group, bundle = %id, ?action, ?outcome, "Bundle change published");
        Ok(true)
    }
}
