//! # Endpoint Description
//!
//! Entry of the cluster-wide service registry.

use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::collections::{BTreeMap, BTreeSet};

/// Cluster map holding every exported endpoint.
pub const ENDPOINTS_MAP_NAME: &str = "dosgi.endpoints";

/// Property carrying the service class.
pub const OBJECT_CLASS: &str = "objectClass";

/// Property carrying the exported version.
pub const SERVICE_VERSION: &str = "service.version";

/// Key of an endpoint: `service_class/version`.
#[must_use]
pub fn endpoint_id(service_class: &str, version: &str) -> String {
    format!("{service_class}/{version}")
}

/// An exported service and the nodes providing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    pub id: String,
    pub service_class: String,
    pub version: String,
    pub providers: BTreeSet<NodeId>,
    /// Filter expression every lookup selecting this endpoint satisfies.
    pub filter: String,
    /// Service properties, including `objectClass` and `service.version`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl EndpointDescription {
    #[must_use]
    pub fn new(
        service_class: impl Into<String>,
        version: impl Into<String>,
        provider: NodeId,
        mut properties: BTreeMap<String, String>,
    ) -> Self {
        let service_class = service_class.into();
        let version = version.into();
        properties.insert(OBJECT_CLASS.to_string(), service_class.clone());
        properties.insert(SERVICE_VERSION.to_string(), version.clone());
        let filter = identity_filter(&properties);
        Self {
            id: endpoint_id(&service_class, &version),
            service_class,
            version,
            providers: BTreeSet::from([provider]),
            filter,
            properties,
        }
    }

    #[must_use]
    pub fn is_provided_by(&self, node: &NodeId) -> bool {
        self.providers.contains(node)
    }

    /// Providers other than `local`, in id order.
    pub fn remote_providers<'a>(&'a self, local: &'a NodeId) -> impl Iterator<Item = &'a NodeId> {
        self.providers.iter().filter(move |node| *node != local)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn identity_filter(properties: &BTreeMap<String, String>) -> String {
    let mut filter = String::from("(&");
    for key in [OBJECT_CLASS, SERVICE_VERSION] {
        if let Some(value) = properties.get(key) {
            filter.push_str(&format!("({key}={})", escape(value)));
        }
    }
    filter.push(')');
    filter
}
