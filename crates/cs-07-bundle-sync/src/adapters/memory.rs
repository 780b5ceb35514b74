use crate::domain::{BundleInfo, BundleState, BundleSyncError};
use crate::ports::BundleRuntime;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory bundle framework for tests and single-process clusters.
///
/// Locations registered with [`InMemoryBundleRuntime::fail_start`] refuse to
/// start, the way a bundle with unresolved requirements would.
#[derive(Debug, Default)]
pub struct InMemoryBundleRuntime {
    bundles: RwLock<BTreeMap<String, BundleInfo>>,
    unstartable: RwLock<BTreeSet<String>>,
    updates: RwLock<BTreeMap<String, u32>>,
}

impl InMemoryBundleRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later start of the bundle at `location` fail.
    pub fn fail_start(&self, location: impl Into<String>) {
        self.unstartable.write().insert(location.into());
    }

    /// Number of updates applied to `id`.
    #[must_use]
    pub fn update_count(&self, id: &str) -> u32 {
        self.updates.read().get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.read().is_empty()
    }

    fn set_state(&self, id: &str, state: BundleState) -> Result<(), BundleSyncError> {
        let mut bundles = self.bundles.write();
        let bundle = bundles
            .get_mut(id)
            .ok_or_else(|| BundleSyncError::NotInstalled(id.to_string()))?;
        bundle.state = state;
        Ok(())
    }
}

impl BundleRuntime for InMemoryBundleRuntime {
    fn list(&self) -> Vec<BundleInfo> {
        self.bundles.read().values().cloned().collect()
    }

    fn get(&self, id: &str) -> Option<BundleInfo> {
        self.bundles.read().get(id).cloned()
    }

    fn find_by_location(&self, location: &str) -> Option<BundleInfo> {
        self.bundles
            .read()
            .values()
            .find(|b| b.location == location)
            .cloned()
    }

    fn install(&self, bundle: &BundleInfo) -> Result<(), BundleSyncError> {
        self.bundles
            .write()
            .entry(bundle.id())
            .or_insert_with(|| bundle.clone().with_state(BundleState::Installed));
        Ok(())
    }

    fn start(&self, id: &str) -> Result<(), BundleSyncError> {
        let location = self
            .get(id)
            .map(|b| b.location)
            .ok_or_else(|| BundleSyncError::NotInstalled(id.to_string()))?;
        if self.unstartable.read().contains(&location) {
            return Err(BundleSyncError::Runtime {
                id: id.to_string(),
                reason: "unresolved requirements".to_string(),
            });
        }
        self.set_state(id, BundleState::Active)
    }

    fn stop(&self, id: &str) -> Result<(), BundleSyncError> {
        self.set_state(id, BundleState::Resolved)
    }

    fn update(&self, id: &str) -> Result<(), BundleSyncError> {
        if !self.bundles.read().contains_key(id) {
            return Err(BundleSyncError::NotInstalled(id.to_string()));
        }
        *self.updates.write().entry(id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn uninstall(&self, id: &str) -> Result<bool, BundleSyncError> {
        Ok(self.bundles.write().remove(id).is_some())
    }
}
