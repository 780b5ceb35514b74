//! # Command Payloads
//!
//! Two-way messages exchanged between nodes. A `Command` is sent to a set of
//! destination nodes; each destination answers with one `CommandResult`
//! carrying the command's correlation id.
//!
//! ## Built-in Commands
//!
//! | Kind | Effect on the receiving node |
//! |------|------------------------------|
//! | `Ping` | Answers `Pong` |
//! | `ProducerSwitch` | Queries or toggles the event producer switch |
//! | `ConsumerSwitch` | Queries or toggles the event consumer switch |
//! | `ManageHandlers` | Lists handlers or toggles one handler's switch |
//! | `ManageGroup` | Joins, quits, purges or sets local group membership |
//! | `RemoteServiceCall` | Invokes a method of a service exported by the node |
//! | `Custom` | Application-defined, routed by name |

use crate::correlation::CorrelationId;
use crate::entities::{Node, NodeId};
use crate::switch::SwitchStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// Timeout applied to commands that do not set one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Dispatch tag of a command payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    Ping,
    ProducerSwitch,
    ConsumerSwitch,
    ManageHandlers,
    ManageGroup,
    RemoteServiceCall,
    Custom(String),
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "Custom({name})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Query or change a switch. `Status` leaves it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchAction {
    Status,
    On,
    Off,
}

/// Membership change requested through `ManageGroup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupAction {
    /// Join the named group.
    Join,
    /// Leave the named group.
    Quit,
    /// Leave every group, then rejoin the default group.
    Purge,
    /// Leave every group, then join the named group.
    Set,
    /// Report current membership only.
    List,
}

/// Body of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    Ping,
    ProducerSwitch {
        action: SwitchAction,
    },
    ConsumerSwitch {
        action: SwitchAction,
    },
    ManageHandlers {
        /// Handler to toggle. `None` lists every handler.
        handler: Option<String>,
        action: SwitchAction,
    },
    ManageGroup {
        action: GroupAction,
        group: Option<String>,
    },
    RemoteServiceCall {
        /// Registry key of the endpoint, `service_class/version`.
        endpoint_id: String,
        method: String,
        #[serde(default)]
        arguments: Vec<serde_json::Value>,
    },
    Custom {
        name: String,
        body: serde_json::Value,
    },
}

impl CommandPayload {
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Ping => CommandKind::Ping,
            Self::ProducerSwitch { .. } => CommandKind::ProducerSwitch,
            Self::ConsumerSwitch { .. } => CommandKind::ConsumerSwitch,
            Self::ManageHandlers { .. } => CommandKind::ManageHandlers,
            Self::ManageGroup { .. } => CommandKind::ManageGroup,
            Self::RemoteServiceCall { .. } => CommandKind::RemoteServiceCall,
            Self::Custom { name, .. } => CommandKind::Custom(name.clone()),
        }
    }
}

/// A correlated request sent to one or more nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id shared with every result.
    pub id: CorrelationId,
    /// Sender, stamped by the producer on publish.
    pub source_node: Option<Node>,
    /// Group whose members receive the command when `destination` is empty.
    pub group: Option<String>,
    /// Explicit recipients. Empty means every member of `group`.
    pub destination: BTreeSet<NodeId>,
    /// Time the sender waits for results, in milliseconds.
    pub timeout_ms: u64,
    pub payload: CommandPayload,
}

impl Command {
    /// Create a command with a fresh id and the default timeout.
    #[must_use]
    pub fn new(payload: CommandPayload) -> Self {
        Self {
            id: CorrelationId::new(),
            source_node: None,
            group: None,
            destination: BTreeSet::new(),
            timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            payload,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: CorrelationId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_destination<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.destination = nodes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.payload.kind()
    }
}

/// Body of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultPayload {
    Pong {
        node: NodeId,
    },
    Switch {
        status: SwitchStatus,
    },
    Handlers {
        handlers: BTreeMap<String, SwitchStatus>,
    },
    Groups {
        groups: BTreeSet<String>,
    },
    Custom {
        body: serde_json::Value,
    },
    /// The receiving node could not execute the command.
    Failed {
        message: String,
    },
}

/// One node's answer to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: CorrelationId,
    pub source_node: Node,
    pub payload: ResultPayload,
}

impl CommandResult {
    #[must_use]
    pub fn new(command_id: CorrelationId, source_node: Node, payload: ResultPayload) -> Self {
        Self {
            command_id,
            source_node,
            payload,
        }
    }

    /// Result reporting that the command failed on `source_node`.
    #[must_use]
    pub fn failed(command_id: CorrelationId, source_node: Node, message: impl Into<String>) -> Self {
        Self::new(
            command_id,
            source_node,
            ResultPayload::Failed {
                message: message.into(),
            },
        )
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.payload, ResultPayload::Failed { .. })
    }
}
