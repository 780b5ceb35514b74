//! Configuration synchronization errors.

use shared_bus::MapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigSyncError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error(transparent)]
    Map(#[from] MapError),
}
