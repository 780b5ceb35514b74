//! Bundle synchronization errors.

use shared_bus::MapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleSyncError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Bundle not installed: {0}")]
    NotInstalled(String),

    /// The local framework refused the operation.
    #[error("Bundle {id} failed: {reason}")]
    Runtime { id: String, reason: String },

    #[error(transparent)]
    Map(#[from] MapError),
}
