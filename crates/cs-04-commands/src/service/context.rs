//! # Clustered Execution Context
//!
//! Sends commands through the node's producer and waits on the command
//! store for the results.
//!
//! ## Destination Resolution
//!
//! | Command | Destinations |
//! |---------|--------------|
//! | explicit `destination` | exactly those nodes |
//! | `group` set | current members of the group |
//! | neither | current members of the default group |

use crate::domain::{CommandStore, Completion, ExecutionError, ExecutionReport};
use crate::ports::ExecutionContext;
use async_trait::async_trait;
use cs_01_groups::GroupDirectory;
use cs_03_dispatch::EventProducer;
use shared_bus::ClusterEvent;
use shared_types::{Command, NodeId, DEFAULT_GROUP_NAME};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `ExecutionContext` backed by the cluster transport.
pub struct ClusteredExecutionContext {
    producer: Option<Arc<dyn EventProducer>>,
    store: Option<Arc<CommandStore>>,
    groups: Arc<dyn GroupDirectory>,
}

impl ClusteredExecutionContext {
    #[must_use]
    pub fn new(
        producer: Arc<dyn EventProducer>,
        store: Arc<CommandStore>,
        groups: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            producer: Some(producer),
            store: Some(store),
            groups,
        }
    }

    /// Context with neither producer nor store bound yet.
    #[must_use]
    pub fn unbound(groups: Arc<dyn GroupDirectory>) -> Self {
        Self {
            producer: None,
            store: None,
            groups,
        }
    }

    #[must_use]
    pub fn with_producer(mut self, producer: Arc<dyn EventProducer>) -> Self {
        self.producer = Some(producer);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<CommandStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Nodes `command` would be sent to right now.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if the command targets a group that does not exist.
    pub fn resolve_destinations(&self, command: &Command) -> Result<BTreeSet<NodeId>, ExecutionError> {
        if !command.destination.is_empty() {
            return Ok(command.destination.clone());
        }
        let group = command.group.as_deref().unwrap_or(DEFAULT_GROUP_NAME);
        let members = self
            .groups
            .members(group)
            .ok_or_else(|| ExecutionError::GroupNotFound(group.to_string()))?;
        Ok(members.iter().map(|node| node.id().clone()).collect())
    }
}

#[async_trait]
impl ExecutionContext for ClusteredExecutionContext {
    async fn execute(&self, mut command: Command) -> Result<ExecutionReport, ExecutionError> {
        let id = command.id;
        let store = self
            .store
            .as_ref()
            .ok_or(ExecutionError::StoreUnavailable(id))?;
        let producer = self
            .producer
            .as_ref()
            .ok_or(ExecutionError::ProducerUnavailable(id))?;

        let destinations = self.resolve_destinations(&command)?;
        if destinations.is_empty() {
            debug!(correlation_id = %id, kind = %command.kind(), "Command has no destination");
            return Ok(ExecutionReport::empty(id));
        }

        let timeout = command.timeout();
        command.destination = destinations.clone();
        command.source_node = Some(producer.local_node().clone());
        let kind = command.kind();
        let mut receiver = store.submit(id, destinations.clone(), timeout)?;

        let outcome = producer.produce(ClusterEvent::command(command));
        if !outcome.is_published() {
            store.cancel(&id);
            warn!(correlation_id = %id, ?outcome, "Command not published");
            return Err(ExecutionError::NotPublished {
                id,
                reason: format!("{outcome:?}"),
            });
        }
        info!(
            correlation_id = %id,
            %kind,
            destinations = destinations.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Command sent"
        );

        if let Ok(Ok(report)) = tokio::time::timeout(timeout, &mut receiver).await {
            return Ok(report);
        }

        // Deadline reached. A result racing with us may have completed the
        // entry already, in which case the report is waiting in the receiver.
        store.expire(&id);
        match receiver.await {
            Ok(report) => Ok(report),
            Err(_) => {
                debug!(correlation_id = %id, "Command cancelled while waiting");
                Ok(ExecutionReport {
                    command_id: id,
                    results: BTreeMap::new(),
                    completion: Completion::TimedOut,
                    missing: destinations,
                })
            }
        }
    }
}
