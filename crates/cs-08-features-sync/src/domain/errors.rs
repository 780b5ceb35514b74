//! Features synchronization errors.

use shared_bus::MapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeaturesSyncError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// No repository provides the feature.
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid repository url: {0:?}")]
    InvalidRepository(String),

    #[error(transparent)]
    Map(#[from] MapError),
}
