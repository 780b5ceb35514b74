//! # Control Command Handlers
//!
//! Built-in commands operators use to inspect and steer remote nodes.
//!
//! | Handler | Command | Answer |
//! |---------|---------|--------|
//! | `PingHandler` | `Ping` | `Pong` |
//! | `SwitchCommandHandler` | `ProducerSwitch` / `ConsumerSwitch` | switch status after the action |
//! | `ManageHandlersHandler` | `ManageHandlers` | every handler's status |
//! | `ManageGroupHandler` | `ManageGroup` | local group names after the action |

use crate::ports::CommandHandler;
use cs_01_groups::GroupMembership;
use cs_03_dispatch::EventHandlerRegistry;
use shared_types::{
    Command, CommandKind, CommandPayload, GroupAction, HandlerError, NodeId, ResultPayload, Switch,
    SwitchAction, SwitchStatus, DEFAULT_GROUP_NAME,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

fn unsupported(handler: &str) -> HandlerError {
    HandlerError::UnsupportedPayload {
        handler: handler.to_string(),
    }
}

fn apply(switch: &Switch, action: SwitchAction) -> SwitchStatus {
    match action {
        SwitchAction::Status => {}
        SwitchAction::On => switch.turn_on(),
        SwitchAction::Off => switch.turn_off(),
    }
    switch.status()
}

// =============================================================================
// PING
// =============================================================================

/// Answers `Ping` with the local node id.
pub struct PingHandler {
    local: NodeId,
    switch: Switch,
}

impl PingHandler {
    pub const NAME: &'static str = "ping";

    #[must_use]
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            switch: Switch::new(Self::NAME),
        }
    }

    /// Gate this handler with `switch` instead of a private one, so a
    /// `SwitchBoard` can address it by id.
    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }
}

impl CommandHandler for PingHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Ping
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
        match command.payload {
            CommandPayload::Ping => Ok(ResultPayload::Pong {
                node: self.local.clone(),
            }),
            _ => Err(unsupported(Self::NAME)),
        }
    }
}

// =============================================================================
// PRODUCER / CONSUMER SWITCH
// =============================================================================

/// Queries or toggles the producer or consumer switch of the node.
pub struct SwitchCommandHandler {
    name: &'static str,
    kind: CommandKind,
    target: Switch,
    switch: Switch,
}

impl SwitchCommandHandler {
    pub const PRODUCER_NAME: &'static str = "producer-switch";
    pub const CONSUMER_NAME: &'static str = "consumer-switch";

    /// Handler for `ProducerSwitch` acting on `target`.
    #[must_use]
    pub fn producer(target: Switch) -> Self {
        Self {
            name: Self::PRODUCER_NAME,
            kind: CommandKind::ProducerSwitch,
            target,
            switch: Switch::new(Self::PRODUCER_NAME),
        }
    }

    /// Handler for `ConsumerSwitch` acting on `target`.
    #[must_use]
    pub fn consumer(target: Switch) -> Self {
        Self {
            name: Self::CONSUMER_NAME,
            kind: CommandKind::ConsumerSwitch,
            target,
            switch: Switch::new(Self::CONSUMER_NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }
}

impl CommandHandler for SwitchCommandHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> CommandKind {
        self.kind.clone()
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
        let action = match (&self.kind, &command.payload) {
            (CommandKind::ProducerSwitch, CommandPayload::ProducerSwitch { action })
            | (CommandKind::ConsumerSwitch, CommandPayload::ConsumerSwitch { action }) => *action,
            _ => return Err(unsupported(self.name)),
        };
        let status = apply(&self.target, action);
        if action != SwitchAction::Status {
            info!(switch = self.target.id(), %status, "Switch changed by remote command");
        }
        Ok(ResultPayload::Switch { status })
    }
}

// =============================================================================
// MANAGE HANDLERS
// =============================================================================

/// Lists handlers, or toggles one handler's switch by name.
pub struct ManageHandlersHandler {
    registry: Arc<EventHandlerRegistry>,
    switch: Switch,
}

impl ManageHandlersHandler {
    pub const NAME: &'static str = "manage-handlers";

    #[must_use]
    pub fn new(registry: Arc<EventHandlerRegistry>) -> Self {
        Self {
            registry,
            switch: Switch::new(Self::NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }
}

impl CommandHandler for ManageHandlersHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ManageHandlers
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
        let CommandPayload::ManageHandlers { handler, action } = &command.payload else {
            return Err(unsupported(Self::NAME));
        };

        if let Some(name) = handler {
            let target = self
                .registry
                .find_handler(name)
                .ok_or_else(|| HandlerError::failed(Self::NAME, format!("no handler named {name}")))?;
            let status = apply(target.switch(), *action);
            info!(handler = %name, %status, "Handler switch changed by remote command");
        }

        let handlers: BTreeMap<String, SwitchStatus> = self
            .registry
            .handlers()
            .into_iter()
            .map(|info| (info.name, info.status))
            .collect();
        Ok(ResultPayload::Handlers { handlers })
    }
}

// =============================================================================
// MANAGE GROUP
// =============================================================================

/// Changes the local node's group membership.
///
/// A node never ends up in no group: leaving the last one rejoins the
/// default group.
pub struct ManageGroupHandler {
    groups: Arc<dyn GroupMembership>,
    switch: Switch,
}

impl ManageGroupHandler {
    pub const NAME: &'static str = "manage-group";

    #[must_use]
    pub fn new(groups: Arc<dyn GroupMembership>) -> Self {
        Self {
            groups,
            switch: Switch::new(Self::NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }

    fn leave_all(&self) -> Result<(), HandlerError> {
        for name in self.groups.list_local_group_names() {
            self.groups.unregister_group(&name).map_err(|e| self.failure(e))?;
        }
        Ok(())
    }

    fn ensure_membership(&self) -> Result<(), HandlerError> {
        if self.groups.list_local_group_names().is_empty() {
            self.groups
                .register_group(DEFAULT_GROUP_NAME)
                .map_err(|e| self.failure(e))?;
        }
        Ok(())
    }

    fn failure(&self, error: impl std::fmt::Display) -> HandlerError {
        HandlerError::failed(Self::NAME, error.to_string())
    }
}

impl CommandHandler for ManageGroupHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ManageGroup
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
        let CommandPayload::ManageGroup { action, group } = &command.payload else {
            return Err(unsupported(Self::NAME));
        };
        let target = || {
            group
                .as_deref()
                .ok_or_else(|| self.failure(format!("{action:?} needs a group name")))
        };

        match action {
            GroupAction::List => {}
            GroupAction::Join => {
                self.groups.register_group(target()?).map_err(|e| self.failure(e))?;
            }
            GroupAction::Quit => {
                self.groups.unregister_group(target()?).map_err(|e| self.failure(e))?;
                self.ensure_membership()?;
            }
            GroupAction::Purge => {
                self.leave_all()?;
                self.ensure_membership()?;
            }
            GroupAction::Set => {
                let name = target()?;
                self.leave_all()?;
                self.groups.register_group(name).map_err(|e| self.failure(e))?;
            }
        }
        if *action != GroupAction::List {
            info!(?action, group = ?group, "Local group membership changed by remote command");
        }

        Ok(ResultPayload::Groups {
            groups: self.groups.list_local_group_names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_01_groups::GroupManager;
    use cs_03_dispatch::EventHandler;
    use shared_bus::{ClusterEvent, EventKind};
    use shared_types::Node;
    use std::collections::BTreeSet;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn group_command(action: GroupAction, group: Option<&str>) -> Command {
        Command::new(CommandPayload::ManageGroup {
            action,
            group: group.map(str::to_string),
        })
    }

    #[test]
    fn test_ping_answers_pong() {
        let handler = PingHandler::new("node-b".into());
        let payload = handler.execute(&Command::new(CommandPayload::Ping)).unwrap();
        assert_eq!(payload, ResultPayload::Pong { node: "node-b".into() });
    }

    #[test]
    fn test_ping_rejects_other_payloads() {
        let handler = PingHandler::new("node-b".into());
        let command = Command::new(CommandPayload::ProducerSwitch {
            action: SwitchAction::Status,
        });
        assert!(handler.execute(&command).is_err());
    }

    #[test]
    fn test_producer_switch_toggles_target() {
        let target = Switch::new("producer");
        let handler = SwitchCommandHandler::producer(target.clone());

        let off = Command::new(CommandPayload::ProducerSwitch { action: SwitchAction::Off });
        assert_eq!(
            handler.execute(&off).unwrap(),
            ResultPayload::Switch { status: SwitchStatus::Off }
        );
        assert!(!target.is_on());

        let status = Command::new(CommandPayload::ProducerSwitch {
            action: SwitchAction::Status,
        });
        assert_eq!(
            handler.execute(&status).unwrap(),
            ResultPayload::Switch { status: SwitchStatus::Off }
        );
    }

    #[test]
    fn test_consumer_handler_ignores_producer_payload() {
        let handler = SwitchCommandHandler::consumer(Switch::new("consumer"));
        let command = Command::new(CommandPayload::ProducerSwitch { action: SwitchAction::Off });
        assert!(matches!(
            handler.execute(&command),
            Err(HandlerError::UnsupportedPayload { .. })
        ));
    }

    struct Noop {
        switch: Switch,
    }

    impl EventHandler for Noop {
        fn name(&self) -> &str {
            "config-handler"
        }

        fn kind(&self) -> EventKind {
            EventKind::Configuration
        }

        fn switch(&self) -> &Switch {
            &self.switch
        }

        fn handle(&self, _event: &ClusterEvent) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn test_manage_handlers_toggle_by_name() {
        let registry = Arc::new(EventHandlerRegistry::new());
        let noop = Arc::new(Noop {
            switch: Switch::new("config-handler"),
        });
        registry.bind(noop.clone());
        let handler = ManageHandlersHandler::new(registry);

        let command = Command::new(CommandPayload::ManageHandlers {
            handler: Some("config-handler".into()),
            action: SwitchAction::Off,
        });
        let ResultPayload::Handlers { handlers } = handler.execute(&command).unwrap() else {
            panic!("expected handler listing");
        };
        assert_eq!(handlers["config-handler"], SwitchStatus::Off);
        assert!(!noop.switch.is_on());
    }

    #[test]
    fn test_manage_handlers_unknown_name_fails() {
        let handler = ManageHandlersHandler::new(Arc::new(EventHandlerRegistry::new()));
        let command = Command::new(CommandPayload::ManageHandlers {
            handler: Some("ghost".into()),
            action: SwitchAction::On,
        });
        assert!(matches!(handler.execute(&command), Err(HandlerError::Failed { .. })));
    }

    #[test]
    fn test_manage_group_join_and_quit() {
        let groups = Arc::new(GroupManager::new(Node::new("node-b", "localhost", 5702)));
        let handler = ManageGroupHandler::new(groups.clone());

        let joined = handler.execute(&group_command(GroupAction::Join, Some("dev"))).unwrap();
        assert_eq!(joined, ResultPayload::Groups { groups: names(&["default", "dev"]) });

        handler.execute(&group_command(GroupAction::Quit, Some("default"))).unwrap();
        let left = handler.execute(&group_command(GroupAction::Quit, Some("dev"))).unwrap();
        // Leaving the last group falls back to default
        assert_eq!(left, ResultPayload::Groups { groups: names(&["default"]) });
    }

    #[test]
    fn test_manage_group_set_and_purge() {
        let groups = Arc::new(GroupManager::new(Node::new("node-b", "localhost", 5702)));
        let handler = ManageGroupHandler::new(groups.clone());

        let set = handler.execute(&group_command(GroupAction::Set, Some("prod"))).unwrap();
        assert_eq!(set, ResultPayload::Groups { groups: names(&["prod"]) });

        let purged = handler.execute(&group_command(GroupAction::Purge, None)).unwrap();
        assert_eq!(purged, ResultPayload::Groups { groups: names(&["default"]) });
    }

    #[test]
    fn test_manage_group_join_needs_name() {
        let groups = Arc::new(GroupManager::new(Node::new("node-b", "localhost", 5702)));
        let handler = ManageGroupHandler::new(groups);
        assert!(handler.execute(&group_command(GroupAction::Join, None)).is_err());
    }
}
