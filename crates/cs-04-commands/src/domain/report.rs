//! Outcome of one command execution.

use shared_types::{CommandResult, CorrelationId, HandlerError, NodeId, ResultPayload};
use std::collections::{BTreeMap, BTreeSet};

/// How a pending command was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every expected node answered before the deadline.
    AllResponded,
    /// The deadline passed first. Results hold whoever answered.
    TimedOut,
}

/// Per-node results of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub command_id: CorrelationId,
    pub results: BTreeMap<NodeId, CommandResult>,
    pub completion: Completion,
    /// Expected nodes that did not answer.
    pub missing: BTreeSet<NodeId>,
}

impl ExecutionReport {
    /// Report for a command that had nobody to wait for.
    #[must_use]
    pub fn empty(command_id: CorrelationId) -> Self {
        Self {
            command_id,
            results: BTreeMap::new(),
            completion: Completion::AllResponded,
            missing: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::AllResponded
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.completion == Completion::TimedOut
    }

    /// Result returned by `node`, if any.
    #[must_use]
    pub fn result_for(&self, node: &NodeId) -> Option<&CommandResult> {
        self.results.get(node)
    }

    /// Remote invocation failures, one per node that answered `Failed`.
    #[must_use]
    pub fn failures(&self) -> Vec<HandlerError> {
        self.results
            .values()
            .filter_map(|result| match &result.payload {
                ResultPayload::Failed { message } => Some(HandlerError::RemoteInvocation {
                    node: result.source_node.id().clone(),
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}
