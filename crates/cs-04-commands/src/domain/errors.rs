//! Errors raised before a command reaches the cluster.

use shared_types::CorrelationId;
use thiserror::Error;

/// Reasons `execute` refuses to run a command.
///
/// A timeout is not an error: it is reported through
/// `ExecutionReport::completion`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("No event producer bound, command {0} not sent")]
    ProducerUnavailable(CorrelationId),

    #[error("No command store bound, command {0} not sent")]
    StoreUnavailable(CorrelationId),

    #[error("Command {0} is already pending")]
    DuplicateCommand(CorrelationId),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// The producer refused to publish the command.
    #[error("Command {id} was not published: {reason}")]
    NotPublished { id: CorrelationId, reason: String },
}
