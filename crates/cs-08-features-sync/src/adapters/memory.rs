use crate::domain::{FeatureState, FeaturesSyncError};
use crate::ports::FeaturesService;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory provisioning service for tests and single-process clusters.
///
/// Features are keyed by `(name, version)`. Installing an explicit version
/// the service has never seen registers it, so remote nodes can be
/// mirrored without declaring every feature up front.
#[derive(Debug, Default)]
pub struct InMemoryFeaturesService {
    repositories: RwLock<BTreeSet<String>>,
    features: RwLock<BTreeMap<(String, String), bool>>,
}

impl InMemoryFeaturesService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a feature available without installing it.
    pub fn provide(&self, name: impl Into<String>, version: impl Into<String>) {
        self.features
            .write()
            .entry((name.into(), version.into()))
            .or_insert(false);
    }

    /// Highest known version of `name`, or `version` when given.
    fn resolve(&self, name: &str, version: Option<&str>) -> Option<String> {
        if let Some(version) = version {
            return Some(version.to_string());
        }
        self.features
            .read()
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .max()
    }
}

impl FeaturesService for InMemoryFeaturesService {
    fn list_repositories(&self) -> Vec<String> {
        self.repositories.read().iter().cloned().collect()
    }

    fn add_repository(&self, url: &str) -> Result<(), FeaturesSyncError> {
        if url.trim().is_empty() || url.chars().any(char::is_whitespace) {
            return Err(FeaturesSyncError::InvalidRepository(url.to_string()));
        }
        self.repositories.write().insert(url.to_string());
        Ok(())
    }

    fn remove_repository(&self, url: &str) -> bool {
        self.repositories.write().remove(url)
    }

    fn list_features(&self) -> Vec<FeatureState> {
        self.features
            .read()
            .iter()
            .map(|((name, version), installed)| FeatureState::new(name, version, *installed))
            .collect()
    }

    fn is_installed(&self, name: &str, version: Option<&str>) -> bool {
        self.features
            .read()
            .iter()
            .any(|((n, v), installed)| *installed && n == name && version.map_or(true, |x| x == v))
    }

    fn install_feature(&self, name: &str, version: Option<&str>) -> Result<(), FeaturesSyncError> {
        let version = self
            .resolve(name, version)
            .ok_or_else(|| FeaturesSyncError::FeatureNotFound(name.to_string()))?;
        self.features
            .write()
            .insert((name.to_string(), version), true);
        Ok(())
    }

    fn uninstall_feature(&self, name: &str, version: Option<&str>) -> bool {
        let mut features = self.features.write();
        let mut removed = false;
        for ((n, v), installed) in features.iter_mut() {
            if *installed && n == name && version.map_or(true, |x| x == v) {
                *installed = false;
                removed = true;
            }
        }
        removed
    }
}
