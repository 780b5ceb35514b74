//! Group error types.

use thiserror::Error;

/// Errors from group management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("Group not found: {0}")]
    NotFound(String),

    #[error("Group already exists: {0}")]
    AlreadyExists(String),

    #[error("The default group cannot be deleted")]
    DefaultGroupProtected,

    #[error("Invalid group name: {0:?}")]
    InvalidName(String),

    /// The shared membership map could not be read or written.
    #[error("Membership record of node {node} unavailable: {reason}")]
    Membership { node: String, reason: String },

    /// Setting the parent would make a group inherit from itself.
    #[error("Parent {parent} of group {group} would create an inheritance cycle")]
    ParentCycle { group: String, parent: String },
}
