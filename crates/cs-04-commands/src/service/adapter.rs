//! # Command Event Adapters
//!
//! Bridge the command layer onto the event registry.
//!
//! - `CommandEventHandler` runs a `CommandHandler` for incoming commands
//!   and sends the result back to the caller.
//! - `ResultHandler` feeds incoming results into the `CommandStore`.

use crate::domain::CommandStore;
use crate::ports::CommandHandler;
use cs_03_dispatch::{EventHandler, EventProducer};
use shared_bus::{ClusterEvent, EventKind, EventPayload};
use shared_types::{Command, CommandResult, HandlerError, Node, ResultPayload, Switch};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Switch id of the result handler.
pub const RESULT_HANDLER_ID: &str = "result-handler";

/// `EventHandler` that executes a command and answers the sender.
pub struct CommandEventHandler {
    kind: EventKind,
    handler: Arc<dyn CommandHandler>,
    local: Node,
    producer: Option<Arc<dyn EventProducer>>,
}

impl CommandEventHandler {
    #[must_use]
    pub fn new(handler: Arc<dyn CommandHandler>, producer: Arc<dyn EventProducer>) -> Self {
        let local = producer.local_node().clone();
        Self {
            kind: EventKind::Command(handler.kind()),
            handler,
            local,
            producer: Some(producer),
        }
    }

    /// Handler that executes commands but has no way to reply.
    #[must_use]
    pub fn without_producer(handler: Arc<dyn CommandHandler>, local: Node) -> Self {
        Self {
            kind: EventKind::Command(handler.kind()),
            handler,
            local,
            producer: None,
        }
    }

    fn run(&self, command: &Command) -> ResultPayload {
        match catch_unwind(AssertUnwindSafe(|| self.handler.execute(command))) {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!(
                    handler = self.handler.name(),
                    correlation_id = %command.id,
                    error = %e,
                    "Command failed"
                );
                ResultPayload::Failed { message: e.to_string() }
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    handler = self.handler.name(),
                    correlation_id = %command.id,
                    panic = %message,
                    "Command handler panicked"
                );
                ResultPayload::Failed {
                    message: format!("handler {} panicked: {message}", self.handler.name()),
                }
            }
        }
    }
}

impl EventHandler for CommandEventHandler {
    fn name(&self) -> &str {
        self.handler.name()
    }

    fn kind(&self) -> EventKind {
        self.kind.clone()
    }

    fn switch(&self) -> &Switch {
        self.handler.switch()
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Command(command) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: self.name().to_string(),
            });
        };

        let payload = self.run(command);
        let result = CommandResult::new(command.id, self.local.clone(), payload);

        let Some(reply_to) = event
            .source_id()
            .or_else(|| command.source_node.as_ref().map(Node::id))
        else {
            warn!(correlation_id = %command.id, "Command without sender, result dropped");
            return Ok(());
        };
        let producer = self
            .producer
            .as_ref()
            .ok_or(HandlerError::ProducerUnavailable { command_id: command.id })?;

        let outcome = producer.produce(ClusterEvent::result(result, reply_to));
        debug!(
            correlation_id = %command.id,
            reply_to = %reply_to,
            ?outcome,
            "Result sent"
        );
        Ok(())
    }
}

/// `EventHandler` completing pending commands from incoming results.
pub struct ResultHandler {
    store: Arc<CommandStore>,
    switch: Switch,
}

impl ResultHandler {
    #[must_use]
    pub fn new(store: Arc<CommandStore>) -> Self {
        Self {
            store,
            switch: Switch::new(RESULT_HANDLER_ID),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }
}

impl EventHandler for ResultHandler {
    fn name(&self) -> &str {
        RESULT_HANDLER_ID
    }

    fn kind(&self) -> EventKind {
        EventKind::Result
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        let EventPayload::Result(result) = &event.payload else {
            return Err(HandlerError::UnsupportedPayload {
                handler: RESULT_HANDLER_ID.to_string(),
            });
        };
        self.store.on_response(result.clone());
        Ok(())
    }
}
