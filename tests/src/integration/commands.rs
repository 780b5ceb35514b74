//! # Command Flows
//!
//! Correlated commands across running nodes: concurrency, control commands,
//! group targeting, custom handlers and remote failures.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use cs_01_groups::GroupMembership;
    use cs_04_commands::{CommandHandler, ExecutionError};
    use cs_05_config_sync::ConfigurationStore;
    use shared_types::{
        Command, CommandKind, CommandPayload, CommandResult, CorrelationId, GroupAction,
        HandlerError, Node, ResultPayload, Switch, SwitchAction, SwitchStatus,
    };

    use crate::harness::{eventually, TestCluster};

    /// Answers `Custom { name: "echo" }` with its body, or fails on `null`.
    struct EchoHandler {
        switch: Switch,
    }

    impl EchoHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                switch: Switch::new("echo"),
            })
        }
    }

    impl CommandHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        fn kind(&self) -> CommandKind {
            CommandKind::Custom("echo".into())
        }

        fn switch(&self) -> &Switch {
            &self.switch
        }

        fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
            match &command.payload {
                CommandPayload::Custom { body, .. } if !body.is_null() => {
                    Ok(ResultPayload::Custom { body: body.clone() })
                }
                _ => Err(HandlerError::failed("echo", "nothing to echo")),
            }
        }
    }

    fn echo(body: serde_json::Value) -> CommandPayload {
        CommandPayload::Custom {
            name: "echo".into(),
            body,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commands_stay_independent() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        cluster.node(1).bind_command_handler(EchoHandler::new());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let node = a.clone();
            tasks.push(tokio::spawn(async move {
                let command = node
                    .command(echo(serde_json::json!({ "seq": i })))
                    .with_destination(["node-b"]);
                let id = command.id;
                (i, id, node.execute(command).await.unwrap())
            }));
        }

        let mut ids = BTreeSet::new();
        for task in tasks {
            let (i, id, report) = task.await.unwrap();
            assert!(report.is_complete());
            assert_eq!(report.command_id, id);
            assert_eq!(
                report.result_for(&"node-b".into()).unwrap().payload,
                ResultPayload::Custom {
                    body: serde_json::json!({ "seq": i })
                }
            );
            ids.insert(id);
        }
        assert_eq!(ids.len(), 16);
        assert_eq!(a.commands().pending_count(), 0);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unknown_response_is_noop() {
        let cluster = TestCluster::start(&["node-a"]).await;
        let a = cluster.node(0);

        let stray = CommandResult::new(
            CorrelationId::new(),
            Node::new("node-z", "localhost", 5799),
            ResultPayload::Pong {
                node: "node-z".into(),
            },
        );
        assert!(!a.commands().on_response(stray));
        assert_eq!(a.commands().pending_count(), 0);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_responder_bounded_by_timeout() {
        let cluster = TestCluster::start(&["node-a"]).await;
        let a = cluster.node(0);

        let timeout = Duration::from_millis(150);
        let started = Instant::now();
        let report = a
            .execute(
                a.command(CommandPayload::Ping)
                    .with_destination(["ghost-1", "ghost-2"])
                    .with_timeout(timeout),
            )
            .await
            .unwrap();
        assert!(report.is_timed_out());
        assert!(report.results.is_empty());
        assert_eq!(report.missing.len(), 2);
        assert!(started.elapsed() < timeout + Duration::from_secs(1));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unknown_group_rejected() {
        let cluster = TestCluster::start(&["node-a"]).await;
        let a = cluster.node(0);

        let err = a
            .execute(a.command(CommandPayload::Ping).with_group("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::GroupNotFound("ghost".into()));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_group_targeted_command() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);

        let join = a
            .command(CommandPayload::ManageGroup {
                action: GroupAction::Join,
                group: Some("dev".into()),
            })
            .with_destination(["node-b"]);
        assert!(a.execute(join).await.unwrap().is_complete());

        // The join made on node-b is visible from node-a
        let dev = a.groups().find_group_by_name("dev").unwrap();
        assert_eq!(dev.members().len(), 1);
        assert!(!a.groups().is_local_group("dev"));

        let report = a
            .execute(a.command(CommandPayload::Ping).with_group("dev"))
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.results.len(), 1);
        assert_eq!(
            report.result_for(&"node-b".into()).unwrap().payload,
            ResultPayload::Pong {
                node: "node-b".into()
            }
        );

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_remote_group_management() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);

        let manage = |action, group: Option<&str>| {
            a.command(CommandPayload::ManageGroup {
                action,
                group: group.map(str::to_string),
            })
            .with_destination(["node-b"])
        };
        let groups_of = |report: &cs_04_commands::ExecutionReport| {
            match &report.result_for(&"node-b".into()).unwrap().payload {
                ResultPayload::Groups { groups } => groups.clone(),
                other => panic!("unexpected payload {other:?}"),
            }
        };

        let report = a.execute(manage(GroupAction::Join, Some("dev"))).await.unwrap();
        assert_eq!(
            groups_of(&report),
            BTreeSet::from(["default".to_string(), "dev".to_string()])
        );
        assert!(b.groups().is_local_group("dev"));

        let report = a.execute(manage(GroupAction::Set, Some("ops"))).await.unwrap();
        assert_eq!(groups_of(&report), BTreeSet::from(["ops".to_string()]));

        let report = a.execute(manage(GroupAction::Purge, None)).await.unwrap();
        assert_eq!(groups_of(&report), BTreeSet::from(["default".to_string()]));
        assert_eq!(
            b.groups().list_local_group_names(),
            BTreeSet::from(["default".to_string()])
        );

        let report = a.execute(manage(GroupAction::Join, None)).await.unwrap();
        assert_eq!(report.failures().len(), 1);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_remote_failure_reported_per_node() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);
        cluster.node(1).bind_command_handler(EchoHandler::new());
        cluster.node(2).bind_command_handler(EchoHandler::new());

        let report = a
            .execute(
                a.command(echo(serde_json::Value::Null))
                    .with_destination(["node-b", "node-c"]),
            )
            .await
            .unwrap();
        assert!(report.is_complete());
        let failures = report.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|f| matches!(f, HandlerError::RemoteInvocation { .. })));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_consumer_switch_blocks_events_not_commands() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);

        let off = a
            .command(CommandPayload::ConsumerSwitch {
                action: SwitchAction::Off,
            })
            .with_destination(["node-b"]);
        let report = a.execute(off).await.unwrap();
        assert_eq!(
            report.result_for(&"node-b".into()).unwrap().payload,
            ResultPayload::Switch {
                status: SwitchStatus::Off
            }
        );

        let props = [("port".to_string(), "9090".to_string())].into_iter().collect();
        assert_eq!(a.update_configuration("org.acme", props).unwrap(), 1);
        assert!(eventually(|| b.snapshot().events_switched_off >= 1).await);
        assert!(b.configurations().get("org.acme").is_none());

        let report = a
            .execute(a.command(CommandPayload::Ping).with_destination(["node-b"]))
            .await
            .unwrap();
        assert!(report.is_complete());

        cluster.shutdown().await;
    }
}
