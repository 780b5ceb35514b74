//! # Bundle Event Handler
//!
//! Applies bundle changes announced by other nodes, then records the state
//! the bundle reached in the group's cluster map.

use crate::domain::{bundle_map_name, BundleInfo, BundleState, BundleSyncError};
use crate::ports::BundleRuntime;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventHandler;
use shared_bus::{
    BundleAction, BundleChange, ClusterEvent, DistributedMaps, EventKind, EventPayload,
    BUNDLE_CATEGORY,
};
use shared_types::{EventType, HandlerError, NodeId, Switch};
use std::sync::Arc;
use tracing::{debug, info};

/// Handles `Bundle` events on the receiving node.
pub struct BundleEventHandler {
    local: NodeId,
    runtime: Arc<dyn BundleRuntime>,
    maps: Arc<dyn DistributedMaps>,
    filter: Arc<dyn ResourceFilter>,
    switch: Switch,
}

impl BundleEventHandler {
    pub const NAME: &'static str = "bundle-handler";

    #[must_use]
    pub fn new(
        local: NodeId,
        runtime: Arc<dyn BundleRuntime>,
        maps: Arc<dyn DistributedMaps>,
        filter: Arc<dyn ResourceFilter>,
    ) -> Self {
        Self {
            local,
            runtime,
            maps,
            filter,
            switch: Switch::new(Self::NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }

    fn apply(&self, group: &str, change: &BundleChange) -> Result<(), BundleSyncError> {
        let id = change.id();
        let map = self.maps.get_map(&bundle_map_name(group));
        let mut bundle = BundleInfo::new(&change.symbolic_name, &change.version, &change.location);
        bundle.start_level = change.start_level;

        match change.action {
            BundleAction::Installed => {
                self.runtime.install(&bundle)?;
            }
            BundleAction::Started => {
                self.runtime.install(&bundle)?;
                self.runtime.start(&id)?;
            }
            BundleAction::Stopped => {
                if self.runtime.get(&id).is_some() {
                    self.runtime.stop(&id)?;
                }
            }
            BundleAction::Updated => {
                if self.runtime.get(&id).is_some() {
                    self.runtime.update(&id)?;
                }
                info!(group, bundle = %id, "Bundle updated from cluster");
                return Ok(());
            }
            BundleAction::Uninstalled => {
                self.runtime.uninstall(&id)?;
                map.remove(&id);
                info!(group, bundle = %id, "Bundle uninstalled from cluster");
                return Ok(());
            }
        }

        if let Some(state) = BundleState::after(change.action) {
            map.put(&id, &bundle.with_state(state))?;
            info!(group, bundle = %id, %state, "Bundle applied from cluster");
        }
        Ok(())
    }
}

impl EventHandler for BundleEventHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> EventKind {
        EventKind::Bundle
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Bundle(change) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: Self::NAME.to_string(),
            });
        };
        if event.source_id() == Some(&self.local) {
            return Ok(());
        }
        let Some(group) = event.source_group.as_deref() else {
            debug!(bundle = %change.id(), "Bundle event without group ignored");
            return Ok(());
        };
        if !self
            .filter
            .is_allowed(group, BUNDLE_CATEGORY, &change.location, EventType::Inbound)
        {
            debug!(group, location = %change.location, "Bundle blocked inbound");
            return Ok(());
        }

        self.apply(group, change)
            .map_err(|e| HandlerError::failed(Self::NAME, e.to_string()))
    }
}
