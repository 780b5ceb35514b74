//! # Inbound Ports
//!
//! | Trait | Implemented by | Called by |
//! |-------|----------------|-----------|
//! | `ExecutionContext` | `ClusteredExecutionContext` | Operators, management tooling |
//! | `CommandHandler` | Control handlers, applications | `CommandEventHandler` on the receiving node |

use crate::domain::{ExecutionError, ExecutionReport};
use async_trait::async_trait;
use shared_types::{Command, CommandKind, HandlerError, ResultPayload, Switch};

/// Sends a command to the cluster and waits for the per-node results.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Execute `command` on its destinations.
    ///
    /// Resolves when every destination answered or the command's timeout
    /// elapsed. A timeout is reported through the returned report.
    ///
    /// # Errors
    ///
    /// Fails before anything is sent when the node is not wired for
    /// commands, the id is already pending, or the target group is unknown.
    async fn execute(&self, command: Command) -> Result<ExecutionReport, ExecutionError>;
}

/// Executes one kind of command on the receiving node.
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Kind of command this handler answers.
    fn kind(&self) -> CommandKind;

    fn switch(&self) -> &Switch;

    /// Run `command` locally and produce the result payload.
    ///
    /// # Errors
    ///
    /// The error is sent back to the caller as a `Failed` result.
    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError>;
}
