//! # Group Filtering
//!
//! Decides, per group, whether a resource of a category may be synchronized
//! in a direction.
//!
//! ## Rules
//!
//! - A blacklist match always denies, even when the whitelist also matches.
//! - An empty whitelist allows every resource the blacklist does not deny.
//! - Local shell/management configuration and the cluster layer's own
//!   node configuration are always denied.
//! - Patterns use `*` as the only wildcard and must match the whole id.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = FilteringEngine::new(groups.clone());
//! if engine.is_allowed("default", "config", pid, EventType::Inbound) {
//!     // apply the remote change
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    builtin_exclusion, collection_equals, collection_subset, matches_any, wildcard_match,
    BUILTIN_CONFIG_EXCLUSIONS, CONFIG_CATEGORY,
};
pub use ports::ResourceFilter;
pub use service::{FilterStats, FilteringEngine};
