//! Remote service errors.

use cs_04_commands::ExecutionError;
use shared_bus::MapError;
use shared_types::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("Invalid filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    /// The endpoint exists but no other node provides it.
    #[error("No remote provider for endpoint {0}")]
    NoProvider(String),

    #[error("No method {method} taking {arity} arguments")]
    NoSuchMethod { method: String, arity: usize },

    /// The local service failed while handling a call.
    #[error("Invocation of {method} failed: {reason}")]
    Invocation { method: String, reason: String },

    /// The providing node answered with a failure.
    #[error("Remote call failed on {node}: {message}")]
    Remote { node: NodeId, message: String },

    #[error("No answer from {node} for endpoint {endpoint}")]
    NoResponse { endpoint: String, node: NodeId },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Map(#[from] MapError),
}
