//! # Filtering Engine
//!
//! Evaluates a group's whitelist and blacklist for one resource.
//!
//! ## Decision Order
//!
//! | Step | Rule | Outcome |
//! |------|------|---------|
//! | 1 | Built-in exclusion matches | deny |
//! | 2 | Unknown group | deny |
//! | 3 | Any blacklist pattern matches | deny |
//! | 4 | Whitelist empty | allow |
//! | 5 | Any whitelist pattern matches | allow, otherwise deny |
//!
//! Lists are resolved through the parent chain on every call, so membership
//! and policy edits are visible to the next decision.

use crate::domain::{builtin_exclusion, matches_any};
use crate::ports::ResourceFilter;
use cs_01_groups::{GroupDirectory, ListType};
use shared_types::EventType;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Counters of filtering decisions.
#[derive(Debug, Default)]
pub struct FilterStats {
    pub allowed: AtomicU64,
    pub denied: AtomicU64,
}

/// Group-scoped allow/deny policy.
pub struct FilteringEngine {
    directory: Arc<dyn GroupDirectory>,
    stats: FilterStats,
}

impl FilteringEngine {
    #[must_use]
    pub fn new(directory: Arc<dyn GroupDirectory>) -> Self {
        Self {
            directory,
            stats: FilterStats::default(),
        }
    }

    /// True when `resource_id` of `category` may travel in `direction`
    /// for `group`.
    #[must_use]
    pub fn is_allowed(
        &self,
        group: &str,
        category: &str,
        resource_id: &str,
        direction: EventType,
    ) -> bool {
        let allowed = self.evaluate(group, category, resource_id, direction);
        let counter = if allowed {
            &self.stats.allowed
        } else {
            &self.stats.denied
        };
        counter.fetch_add(1, Ordering::Relaxed);
        allowed
    }

    fn evaluate(&self, group: &str, category: &str, resource_id: &str, direction: EventType) -> bool {
        if let Some(pattern) = builtin_exclusion(category, resource_id) {
            trace!(group, category, resource_id, pattern, "Resource excluded by built-in rule");
            return false;
        }

        let Some(blacklist) =
            self.directory
                .resolve_list(group, ListType::Blacklist, category, direction)
        else {
            warn!(group, category, resource_id, "Filtering against unknown group, denying");
            return false;
        };

        if let Some(pattern) = matches_any(resource_id, &blacklist) {
            debug!(
                group,
                category,
                resource_id,
                %direction,
                pattern,
                "Resource denied by blacklist"
            );
            return false;
        }

        let whitelist = self
            .directory
            .resolve_list(group, ListType::Whitelist, category, direction)
            .unwrap_or_default();
        if whitelist.is_empty() {
            return true;
        }

        let allowed = matches_any(resource_id, &whitelist).is_some();
        if !allowed {
            debug!(
                group,
                category,
                resource_id,
                %direction,
                "Resource not covered by whitelist"
            );
        }
        allowed
    }

    #[must_use]
    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }
}

impl ResourceFilter for FilteringEngine {
    fn is_allowed(
        &self,
        group: &str,
        category: &str,
        resource_id: &str,
        direction: EventType,
    ) -> bool {
        FilteringEngine::is_allowed(self, group, category, resource_id, direction)
    }
}
