//! Feature entry shared through the cluster map.

use serde::{Deserialize, Serialize};

/// Key of a feature: `name/version`.
#[must_use]
pub fn feature_id(name: &str, version: &str) -> String {
    format!("{name}/{version}")
}

/// A feature known to a node, and whether it is installed there.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureState {
    pub name: String,
    pub version: String,
    pub installed: bool,
}

impl FeatureState {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, installed: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            installed,
        }
    }

    #[must_use]
    pub fn id(&self) -> String {
        feature_id(&self.name, &self.version)
    }
}
