//! Configuration properties and the rules for comparing them across nodes.

use cs_02_filtering::collection_equals;
use std::collections::BTreeMap;

/// Properties of one configuration, keyed by property name.
pub type Properties = BTreeMap<String, String>;

/// Properties that describe the local installation of a configuration and
/// never leave the node.
pub const EXCLUDED_PROPERTIES: &[&str] = &[
    "service.pid",
    "service.factoryPid",
    "felix.fileinstall.filename",
    "felix.fileinstall.dir",
    "felix.fileinstall.tmpdir",
    "org.ops4j.pax.url.mvn.defaultRepositories",
];

#[must_use]
pub fn is_excluded_property(name: &str) -> bool {
    EXCLUDED_PROPERTIES.contains(&name)
}

/// Copy of `properties` without the node-local entries.
#[must_use]
pub fn filter_properties(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(key, _)| !is_excluded_property(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Equality of two configurations once node-local entries are removed.
///
/// A missing configuration only equals another missing one.
#[must_use]
pub fn properties_equal(left: Option<&Properties>, right: Option<&Properties>) -> bool {
    collection_equals(left.map(filter_properties), right.map(filter_properties))
}

/// `incoming` with the node-local entries of `local` kept.
#[must_use]
pub fn merge_for_pull(local: Option<&Properties>, incoming: &Properties) -> Properties {
    let mut merged = filter_properties(incoming);
    if let Some(local) = local {
        for (key, value) in local {
            if is_excluded_property(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}
