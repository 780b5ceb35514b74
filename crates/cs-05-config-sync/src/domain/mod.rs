//! Domain layer.

pub mod errors;
pub mod properties;

pub use errors::ConfigSyncError;
pub use properties::{
    filter_properties, is_excluded_property, merge_for_pull, properties_equal, Properties,
    EXCLUDED_PROPERTIES,
};

/// Name of the cluster map holding the configurations of `group`.
#[must_use]
pub fn configuration_map_name(group: &str) -> String {
    format!("config.{group}")
}
