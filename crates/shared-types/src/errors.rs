//! # Error Types
//!
//! Errors raised by event and command handlers.

use crate::correlation::CorrelationId;
use crate::entities::NodeId;
use thiserror::Error;

/// Failure of a handler while processing an event or command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler ran and reported a failure.
    #[error("Handler {handler} failed: {reason}")]
    Failed { handler: String, reason: String },

    /// The event does not carry the payload this handler expects.
    #[error("Handler {handler} received an unsupported payload")]
    UnsupportedPayload { handler: String },

    /// A result could not be sent back because no producer is bound.
    #[error("No producer available to answer command {command_id}")]
    ProducerUnavailable { command_id: CorrelationId },

    /// A remote node reported a failure while executing a command.
    #[error("Remote invocation failed on {node}: {message}")]
    RemoteInvocation { node: NodeId, message: String },
}

impl HandlerError {
    /// Shorthand for a `Failed` error.
    pub fn failed(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}
