//! Resources that never cross the cluster boundary.
//!
//! The local node's shell and management configuration, and the cluster
//! layer's own node/instance configuration, are always kept local. Group
//! policy cannot re-enable them.

use crate::domain::wildcard::wildcard_match;

/// Category of configuration resources.
pub const CONFIG_CATEGORY: &str = "config";

/// Configuration ids that are always denied, as wildcard patterns.
pub const BUILTIN_CONFIG_EXCLUSIONS: &[&str] = &[
    "org.apache.karaf.shell",
    "org.apache.karaf.shell.*",
    "org.apache.karaf.management",
    "org.apache.karaf.management.*",
    "org.apache.karaf.cellar.node",
    "org.apache.karaf.cellar.instance",
];

/// Built-in exclusion matching `resource_id`, if any.
#[must_use]
pub fn builtin_exclusion(category: &str, resource_id: &str) -> Option<&'static str> {
    if category != CONFIG_CATEGORY {
        return None;
    }
    BUILTIN_CONFIG_EXCLUSIONS
        .iter()
        .copied()
        .find(|p| wildcard_match(resource_id, p))
}
