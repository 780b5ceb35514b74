//! Bundle description shared through the cluster map.

use serde::{Deserialize, Serialize};
use shared_bus::BundleAction;
use std::fmt;

/// Key of a bundle: `symbolic_name/version`.
#[must_use]
pub fn bundle_id(symbolic_name: &str, version: &str) -> String {
    format!("{symbolic_name}/{version}")
}

/// Lifecycle state of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleState {
    Installed,
    Resolved,
    Active,
}

impl BundleState {
    /// State reached after `action`. `None` for actions that leave the
    /// state alone or remove the bundle.
    #[must_use]
    pub fn after(action: BundleAction) -> Option<Self> {
        match action {
            BundleAction::Installed => Some(Self::Installed),
            BundleAction::Started => Some(Self::Active),
            BundleAction::Stopped => Some(Self::Resolved),
            BundleAction::Updated | BundleAction::Uninstalled => None,
        }
    }

    /// Action announcing that a bundle reached this state.
    #[must_use]
    pub fn announced_as(self) -> BundleAction {
        match self {
            Self::Installed => BundleAction::Installed,
            Self::Resolved => BundleAction::Stopped,
            Self::Active => BundleAction::Started,
        }
    }
}

impl fmt::Display for BundleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Installed => "INSTALLED",
            Self::Resolved => "RESOLVED",
            Self::Active => "ACTIVE",
        };
        f.write_str(label)
    }
}

/// One bundle, locally or in a group's cluster map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    pub symbolic_name: String,
    pub version: String,
    pub location: String,
    #[serde(default)]
    pub start_level: Option<u32>,
    pub state: BundleState,
}

impl BundleInfo {
    /// An installed bundle.
    #[must_use]
    pub fn new(
        symbolic_name: impl Into<String>,
        version: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version: version.into(),
            location: location.into(),
            start_level: None,
            state: BundleState::Installed,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: BundleState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_start_level(mut self, level: u32) -> Self {
        self.start_level = Some(level);
        self
    }

    #[must_use]
    pub fn id(&self) -> String {
        bundle_id(&self.symbolic_name, &self.version)
    }
}
