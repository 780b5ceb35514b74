//! # Configuration Event Handler
//!
//! Applies configuration changes announced by other nodes.
//!
//! The event only names the configuration. The properties are read from
//! the group's cluster map, so a late event always applies the latest copy.

use crate::domain::{configuration_map_name, merge_for_pull, properties_equal, Properties};
use crate::ports::ConfigurationStore;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventHandler;
use shared_bus::{
    ChangeType, ClusterEvent, DistributedMaps, EventKind, EventPayload, CONFIGURATION_CATEGORY,
};
use shared_types::{EventType, HandlerError, NodeId, Switch};
use std::sync::Arc;
use tracing::{debug, info};

/// Handles `Configuration` events on the receiving node.
pub struct ConfigurationEventHandler {
    local: NodeId,
    store: Arc<dyn ConfigurationStore>,
    maps: Arc<dyn DistributedMaps>,
    filter: Arc<dyn ResourceFilter>,
    switch: Switch,
}

impl ConfigurationEventHandler {
    pub const NAME: &'static str = "configuration-handler";

    #[must_use]
    pub fn new(
        local: NodeId,
        store: Arc<dyn ConfigurationStore>,
        maps: Arc<dyn DistributedMaps>,
        filter: Arc<dyn ResourceFilter>,
    ) -> Self {
        Self {
            local,
            store,
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
}

impl EventHandler for ConfigurationEventHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> EventKind {
        EventKind::Configuration
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Configuration(change) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: Self::NAME.to_string(),
            });
        };
        if event.source_id() == Some(&self.local) {
            return Ok(());
        }
        let Some(group) = event.source_group.as_deref() else {
            debug!(pid = %change.pid, "Configuration event without group ignored");
            return Ok(());
        };

        let pid = change.pid.as_str();
        if !self
            .filter
            .is_allowed(group, CONFIGURATION_CATEGORY, pid, EventType::Inbound)
        {
            debug!(group, pid, "Configuration blocked inbound");
            return Ok(());
        }

        match change.change {
            ChangeType::Deleted => {
                if self.store.delete(pid) {
                    info!(group, pid, "Configuration deleted from cluster");
                }
            }
            ChangeType::Updated => {
                let map = self.maps.get_map(&configuration_map_name(group));
                let cluster: Option<Properties> = map
                    .get(pid)
                    .map_err(|e| HandlerError::failed(Self::NAME, e.to_string()))?;
                let Some(cluster) = cluster else {
                    debug!(group, pid, "Configuration no longer in cluster map");
                    return Ok(());
                };

                let local = self.store.get(pid);
                if !properties_equal(local.as_ref(), Some(&cluster)) {
                    self.store.update(pid, merge_for_pull(local.as_ref(), &cluster));
                    info!(group, pid, "Configuration pulled from cluster");
                }
            }
        }
        Ok(())
    }
}
