//! # Endpoint Registry
//!
//! The node's view of `dosgi.endpoints` plus the services it exports
//! itself. Every entry change goes through `ClusterMap::compute`, so two
//! nodes exporting the same endpoint at once both end up as providers.

use crate::domain::{
    endpoint_id, EndpointDescription, Filter, RemoteServiceError, ENDPOINTS_MAP_NAME,
};
use crate::ports::RemoteService;
use parking_lot::RwLock;
use shared_bus::{ClusterMap, DistributedMaps};
use shared_types::NodeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of exported endpoints, shared with the cluster.
pub struct EndpointRegistry {
    local: NodeId,
    endpoints: Arc<ClusterMap>,
    services: RwLock<BTreeMap<String, Arc<dyn RemoteService>>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new(local: NodeId, maps: &dyn DistributedMaps) -> Self {
        Self {
            local,
            endpoints: maps.get_map(ENDPOINTS_MAP_NAME),
            services: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn local_node(&self) -> &NodeId {
        &self.local
    }

    /// Export `service` as `service_class/version` from the local node.
    ///
    /// The endpoint is created on first export. A later export by another
    /// node only adds that node as a provider; the first exporter's
    /// properties are kept.
    ///
    /// # Errors
    ///
    /// The map entry could not be read or written.
    pub fn export(
        &self,
        service_class: &str,
        version: &str,
        properties: BTreeMap<String, String>,
        service: Arc<dyn RemoteService>,
    ) -> Result<EndpointDescription, RemoteServiceError> {
        let id = endpoint_id(service_class, version);
        let local = self.local.clone();
        let endpoint = self
            .endpoints
            .compute::<EndpointDescription, _>(&id, |current| {
                Some(match current {
                    Some(mut endpoint) => {
                        endpoint.providers.insert(local);
                        endpoint
                    }
                    None => EndpointDescription::new(service_class, version, local, properties),
                })
            })?
            .ok_or_else(|| RemoteServiceError::EndpointNotFound(id.clone()))?;
        self.services.write().insert(id.clone(), service);
        info!(endpoint = %id, providers = endpoint.providers.len(), "Service exported");
        Ok(endpoint)
    }

    /// Stop exporting endpoint `id` from the local node.
    ///
    /// The entry is dropped when no provider is left. Returns false if the
    /// local node did not export it.
    ///
    /// # Errors
    ///
    /// The map entry could not be read or written.
    pub fn withdraw(&self, id: &str) -> Result<bool, RemoteServiceError> {
        let exported = self.services.write().remove(id).is_some();
        let removed = self.remove_provider(id, &self.local)?;
        if exported || removed {
            info!(endpoint = %id, "Service withdrawn");
        }
        Ok(exported || removed)
    }

    /// Remove `node` from every endpoint it provides.
    ///
    /// Returns the number of endpoints it was removed from.
    ///
    /// # Errors
    ///
    /// A map entry could not be read or written.
    pub fn node_left(&self, node: &NodeId) -> Result<usize, RemoteServiceError> {
        let mut affected = 0;
        for id in self.endpoints.keys() {
            if self.remove_provider(&id, node)? {
                affected += 1;
            }
        }
        if affected > 0 {
            info!(node = %node, endpoints = affected, "Provider removed from endpoints");
        }
        Ok(affected)
    }

    /// Remove every provider not in `active`, as after missed departures.
    ///
    /// Returns the number of providers removed.
    ///
    /// # Errors
    ///
    /// A map entry could not be read or written.
    pub fn prune(&self, active: &BTreeSet<NodeId>) -> Result<usize, RemoteServiceError> {
        let mut removed = 0;
        for id in self.endpoints.keys() {
            self.endpoints.compute::<EndpointDescription, _>(&id, |current| {
                let mut endpoint = current?;
                let before = endpoint.providers.len();
                endpoint.providers.retain(|node| active.contains(node));
                removed += before - endpoint.providers.len();
                (!endpoint.providers.is_empty()).then_some(endpoint)
            })?;
        }
        if removed > 0 {
            debug!(removed, "Inactive providers pruned");
        }
        Ok(removed)
    }

    fn remove_provider(&self, id: &str, node: &NodeId) -> Result<bool, RemoteServiceError> {
        let mut removed = false;
        let remaining = self.endpoints.compute::<EndpointDescription, _>(id, |current| {
            let mut endpoint = current?;
            removed = endpoint.providers.remove(node);
            (!endpoint.providers.is_empty()).then_some(endpoint)
        })?;
        if removed && remaining.is_none() {
            debug!(endpoint = %id, "Endpoint dropped, no provider left");
        }
        Ok(removed)
    }

    /// Every endpoint of the cluster, ordered by id.
    ///
    /// # Errors
    ///
    /// An entry could not be decoded.
    pub fn list(&self) -> Result<Vec<EndpointDescription>, RemoteServiceError> {
        Ok(self
            .endpoints
            .entries::<EndpointDescription>()?
            .into_iter()
            .map(|(_, endpoint)| endpoint)
            .collect())
    }

    /// # Errors
    ///
    /// The entry could not be decoded.
    pub fn find(&self, id: &str) -> Result<Option<EndpointDescription>, RemoteServiceError> {
        Ok(self.endpoints.get(id)?)
    }

    /// Endpoints matching `filter` that some other node provides.
    ///
    /// # Errors
    ///
    /// `InvalidFilter`, or an entry that could not be decoded.
    pub fn lookup(&self, filter: &str) -> Result<Vec<EndpointDescription>, RemoteServiceError> {
        let filter: Filter = filter.parse()?;
        Ok(self
            .list()?
            .into_iter()
            .filter(|endpoint| endpoint.remote_providers(&self.local).next().is_some())
            .filter(|endpoint| filter.matches(&endpoint.properties))
            .collect())
    }

    /// The local service behind endpoint `id`, if this node exports it.
    #[must_use]
    pub fn local_service(&self, id: &str) -> Option<Arc<dyn RemoteService>> {
        self.services.read().get(id).cloned()
    }

    /// Ids of the endpoints this node exports.
    #[must_use]
    pub fn exported(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }
}
