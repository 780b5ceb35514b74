use crate::domain::Properties;
use crate::ports::ConfigurationStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory configuration store for tests and single-process clusters.
#[derive(Debug, Default)]
pub struct InMemoryConfigurationStore {
    configurations: RwLock<BTreeMap<String, Properties>>,
}

impl InMemoryConfigurationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configurations.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurations.read().is_empty()
    }
}

impl ConfigurationStore for InMemoryConfigurationStore {
    fn get(&self, pid: &str) -> Option<Properties> {
        self.configurations.read().get(pid).cloned()
    }

    fn list_pids(&self) -> Vec<String> {
        self.configurations.read().keys().cloned().collect()
    }

    fn update(&self, pid: &str, properties: Properties) {
        self.configurations.write().insert(pid.to_string(), properties);
    }

    fn delete(&self, pid: &str) -> bool {
        self.configurations.write().remove(pid).is_some()
    }
}
