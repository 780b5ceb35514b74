//! Domain layer: pattern matching and exclusion rules.

pub mod collections;
pub mod exclusions;
pub mod wildcard;

pub use collections::{collection_equals, collection_subset};
pub use exclusions::{builtin_exclusion, BUILTIN_CONFIG_EXCLUSIONS, CONFIG_CATEGORY};
pub use wildcard::{matches_any, wildcard_match};
