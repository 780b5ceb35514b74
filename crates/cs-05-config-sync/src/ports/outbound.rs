//! # Outbound Port - ConfigurationStore
//!
//! The node's local configuration admin, as seen by the synchronizer.

use crate::domain::Properties;

/// Local configurations keyed by persistent id.
pub trait ConfigurationStore: Send + Sync {
    fn get(&self, pid: &str) -> Option<Properties>;

    /// Every known pid, sorted.
    fn list_pids(&self) -> Vec<String>;

    /// Create or replace the configuration `pid`.
    fn update(&self, pid: &str, properties: Properties);

    /// Remove `pid`. Returns false if it did not exist.
    fn delete(&self, pid: &str) -> bool;
}
