//! # Cluster Events
//!
//! The envelope carried by the event bus and the payload variants it can
//! hold. The payload variant is the dispatch key: receivers route on
//! `EventKind` instead of inspecting types at runtime.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Node, NodeId};
use shared_types::ipc::{Command, CommandKind, CommandResult};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Filtering category of configuration resources.
pub const CONFIGURATION_CATEGORY: &str = "config";

/// Filtering category of bundles. Entries are matched against the location.
pub const BUNDLE_CATEGORY: &str = "bundle";

/// Filtering category of features. Entries are matched against the name.
pub const FEATURES_CATEGORY: &str = "features";

/// What happened to a configuration on the source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Updated,
    Deleted,
}

/// Notification that a configuration changed in the cluster map.
///
/// The properties themselves travel through the distributed map, the event
/// only names the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationChange {
    pub pid: String,
    pub change: ChangeType,
}

/// Lifecycle transition of a bundle on the source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleAction {
    Installed,
    Started,
    Stopped,
    Updated,
    Uninstalled,
}

/// Notification that a bundle changed on the source node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleChange {
    pub symbolic_name: String,
    pub version: String,
    pub location: String,
    pub start_level: Option<u32>,
    pub action: BundleAction,
}

impl BundleChange {
    /// Key of the bundle in the cluster map: `symbolic_name/version`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.symbolic_name, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureAction {
    Installed,
    Uninstalled,
}

/// Notification that a feature was installed or uninstalled.
///
/// A missing version means whichever version the receiver resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureChange {
    pub name: String,
    pub version: Option<String>,
    pub action: FeatureAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryAction {
    Added,
    Removed,
}

/// Notification that a features repository was added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryChange {
    pub url: String,
    pub action: RepositoryAction,
}

/// Payload variants carried by a `ClusterEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    Configuration(ConfigurationChange),
    Bundle(BundleChange),
    Feature(FeatureChange),
    Repository(RepositoryChange),
    Command(Command),
    Result(CommandResult),
    /// Application-defined event routed by `kind`.
    Custom {
        kind: String,
        body: serde_json::Value,
    },
}

/// Dispatch key derived from an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Configuration,
    Bundle,
    Feature,
    Repository,
    Command(CommandKind),
    Result,
    Custom(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => f.write_str("Configuration"),
            Self::Bundle => f.write_str("Bundle"),
            Self::Feature => f.write_str("Feature"),
            Self::Repository => f.write_str("Repository"),
            Self::Command(kind) => write!(f, "Command({kind})"),
            Self::Result => f.write_str("Result"),
            Self::Custom(kind) => write!(f, "Custom({kind})"),
        }
    }
}

/// A resource subject to group filtering: `(category, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource<'a> {
    pub category: &'a str,
    pub id: &'a str,
}

/// Envelope broadcast to every node subscribed to the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvent {
    pub id: Uuid,
    /// Sending node, stamped by the producer.
    pub source_node: Option<Node>,
    /// Group the event belongs to.
    pub source_group: Option<String>,
    /// Recipients. `None` addresses every node.
    pub destination: Option<BTreeSet<NodeId>>,
    /// Bypass producer and consumer switches.
    pub force: bool,
    pub payload: EventPayload,
}

impl ClusterEvent {
    #[must_use]
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_node: None,
            source_group: None,
            destination: None,
            force: false,
            payload,
        }
    }

    /// Event announcing a configuration change in `group`.
    #[must_use]
    pub fn configuration(group: impl Into<String>, pid: impl Into<String>, change: ChangeType) -> Self {
        Self::new(EventPayload::Configuration(ConfigurationChange {
            pid: pid.into(),
            change,
        }))
        .with_group(group)
    }

    /// Event announcing a bundle change in `group`.
    #[must_use]
    pub fn bundle(group: impl Into<String>, change: BundleChange) -> Self {
        Self::new(EventPayload::Bundle(change)).with_group(group)
    }

    /// Event announcing a feature change in `group`.
    #[must_use]
    pub fn feature(group: impl Into<String>, change: FeatureChange) -> Self {
        Self::new(EventPayload::Feature(change)).with_group(group)
    }

    #[must_use]
    pub fn repository(group: impl Into<String>, change: RepositoryChange) -> Self {
        Self::new(EventPayload::Repository(change)).with_group(group)
    }

    /// Forced event carrying a command to its destinations.
    #[must_use]
    pub fn command(command: Command) -> Self {
        let destination = (!command.destination.is_empty()).then(|| command.destination.clone());
        let group = command.group.clone();
        let mut event = Self::new(EventPayload::Command(command));
        event.destination = destination;
        event.source_group = group;
        event.force = true;
        event
    }

    /// Result addressed back to the node that sent the command.
    #[must_use]
    pub fn result(result: CommandResult, reply_to: &NodeId) -> Self {
        Self::new(EventPayload::Result(result)).with_destination([reply_to.clone()])
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.source_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_destination<I: IntoIterator<Item = NodeId>>(mut self, nodes: I) -> Self {
        self.destination = Some(nodes.into_iter().collect());
        self
    }

    #[must_use]
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Configuration(_) => EventKind::Configuration,
            EventPayload::Bundle(_) => EventKind::Bundle,
            EventPayload::Feature(_) => EventKind::Feature,
            EventPayload::Repository(_) => EventKind::Repository,
            EventPayload::Command(cmd) => EventKind::Command(cmd.kind()),
            EventPayload::Result(_) => EventKind::Result,
            EventPayload::Custom { kind, .. } => EventKind::Custom(kind.clone()),
        }
    }

    /// Resource this event would synchronize, if it is subject to filtering.
    #[must_use]
    pub fn resource(&self) -> Option<Resource<'_>> {
        match &self.payload {
            EventPayload::Configuration(change) => Some(Resource {
                category: CONFIGURATION_CATEGORY,
                id: &change.pid,
            }),
            EventPayload::Bundle(change) => Some(Resource {
                category: BUNDLE_CATEGORY,
                id: &change.location,
            }),
            EventPayload::Feature(change) => Some(Resource {
                category: FEATURES_CATEGORY,
                id: &change.name,
            }),
            _ => None,
        }
    }

    /// True when `node` is among the recipients.
    #[must_use]
    pub fn is_addressed_to(&self, node: &NodeId) -> bool {
        self.destination
            .as_ref()
            .map_or(true, |nodes| nodes.contains(node))
    }

    #[must_use]
    pub fn is_result(&self) -> bool {
        matches!(self.payload, EventPayload::Result(_))
    }

    /// Id of the sending node, if stamped.
    #[must_use]
    pub fn source_id(&self) -> Option<&NodeId> {
        self.source_node.as_ref().map(Node::id)
    }
}

/// Filter applied by a subscription before handing events out.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
    /// Sending nodes to include. Empty means all nodes.
    pub source_nodes: Vec<NodeId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            source_nodes: Vec::new(),
        }
    }

    /// Create a filter for events from specific nodes.
    #[must_use]
    pub fn from_nodes(nodes: Vec<NodeId>) -> Self {
        Self {
            kinds: Vec::new(),
            source_nodes: nodes,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ClusterEvent) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind());

        let source_match = self.source_nodes.is_empty()
            || event
                .source_id()
                .is_some_and(|id| self.source_nodes.contains(id));

        kind_match && source_match
    }
}
