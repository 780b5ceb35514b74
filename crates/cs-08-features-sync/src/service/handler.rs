//! # Feature and Repository Event Handlers
//!
//! Apply feature and repository changes announced by other nodes. Feature
//! events pass the inbound policy unless they are forced.

use crate::ports::FeaturesService;
use cs_02_filtering::ResourceFilter;
use cs_03_dispatch::EventHandler;
use shared_bus::{
    ClusterEvent, EventKind, EventPayload, FeatureAction, RepositoryAction, FEATURES_CATEGORY,
};
use shared_types::{EventType, HandlerError, NodeId, Switch};
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// FEATURES
// =============================================================================

/// Handles `Feature` events on the receiving node.
pub struct FeaturesEventHandler {
    local: NodeId,
    service: Arc<dyn FeaturesService>,
    filter: Arc<dyn ResourceFilter>,
    switch: Switch,
}

impl FeaturesEventHandler {
    pub const NAME: &'static str = "features-handler";

    #[must_use]
    pub fn new(
        local: NodeId,
        service: Arc<dyn FeaturesService>,
        filter: Arc<dyn ResourceFilter>,
    ) -> Self {
        Self {
            local,
            service,
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

impl EventHandler for FeaturesEventHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> EventKind {
        EventKind::Feature
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Feature(change) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: Self::NAME.to_string(),
            });
        };
        if event.source_id() == Some(&self.local) {
            return Ok(());
        }
        let Some(group) = event.source_group.as_deref() else {
            debug!(feature = %change.name, "Feature event without group ignored");
            return Ok(());
        };
        if !event.force
            && !self
                .filter
                .is_allowed(group, FEATURES_CATEGORY, &change.name, EventType::Inbound)
        {
            debug!(group, feature = %change.name, "Feature blocked inbound");
            return Ok(());
        }

        let version = change.version.as_deref();
        match change.action {
            FeatureAction::Installed => {
                self.service
                    .install_feature(&change.name, version)
                    .map_err(|e| HandlerError::failed(Self::NAME, e.to_string()))?;
                info!(group, feature = %change.name, ?version, "Feature installed from cluster");
            }
            FeatureAction::Uninstalled => {
                if self.service.uninstall_feature(&change.name, version) {
                    info!(group, feature = %change.name, ?version, "Feature uninstalled from cluster");
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// REPOSITORIES
// =============================================================================

/// Handles `Repository` events on the receiving node.
pub struct RepositoryEventHandler {
    local: NodeId,
    service: Arc<dyn FeaturesService>,
    switch: Switch,
}

impl RepositoryEventHandler {
    pub const NAME: &'static str = "repository-handler";

    #[must_use]
    pub fn new(local: NodeId, service: Arc<dyn FeaturesService>) -> Self {
        Self {
            local,
            service,
            switch: Switch::new(Self::NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }
}

impl EventHandler for RepositoryEventHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> EventKind {
        EventKind::Repository
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Repository(change) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: Self::NAME.to_string(),
            });
        };
        if event.source_id() == Some(&self.local) {
            return Ok(());
        }
        match change.action {
            RepositoryAction::Added => {
                self.service
                    .add_repository(&change.url)
                    .map_err(|e| HandlerError::failed(Self::NAME, e.to_string()))?;
                info!(url = %change.url, "Feature repository added from cluster");
            }
            RepositoryAction::Removed => {
                if self.service.remove_repository(&change.url) {
                    info!(url = %change.url, "Feature repository removed from cluster");
                }
            }
        }
        Ok(())
    }
}
