//! # Inbound Port - ResourceFilter
//!
//! Policy check consulted by producers before publishing and by handlers
//! before applying a remote change.

use shared_types::EventType;

/// Decides whether a resource may cross the cluster boundary.
///
/// Implementations must be synchronous and free of remote I/O.
pub trait ResourceFilter: Send + Sync {
    /// True when `resource_id` of `category` may travel in `direction`
    /// for `group`.
    fn is_allowed(&self, group: &str, category: &str, resource_id: &str, direction: EventType)
        -> bool;
}
