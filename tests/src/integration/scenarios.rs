//! # Reference Scenarios
//!
//! 1. **Default group blacklist**: `org.apache.karaf.shell` never crosses
//!    the cluster boundary for the default group.
//! 2. **Switch-gated handler**: a `Ping` handler switched off does not
//!    answer, switched back on it does.
//! 3. **Partial results**: two destinations, one silent, the caller gets
//!    the one result and the timeout.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use cs_01_groups::{GroupDefinition, GroupManager};
    use cs_02_filtering::FilteringEngine;
    use cs_04_commands::Completion;
    use cs_05_config_sync::ConfigurationStore;
    use shared_types::{
        CommandPayload, EventType, Node, NodeId, ResultPayload, SwitchAction, SwitchStatus,
        DEFAULT_GROUP_NAME,
    };

    use crate::harness::{eventually, TestCluster};

    // =========================================================================
    // SCENARIO 1: DEFAULT GROUP BLACKLIST
    // =========================================================================

    fn default_policy() -> FilteringEngine {
        let groups = Arc::new(GroupManager::new(Node::new("node-a", "localhost", 5701)));
        groups.apply_definition(&GroupDefinition::default_group()).unwrap();
        FilteringEngine::new(groups)
    }

    #[test]
    fn test_shell_configuration_denied_both_ways() {
        let filter = default_policy();
        for direction in [EventType::Inbound, EventType::Outbound] {
            assert!(!filter.is_allowed(
                DEFAULT_GROUP_NAME,
                "config",
                "org.apache.karaf.shell",
                direction
            ));
            assert!(filter.is_allowed(DEFAULT_GROUP_NAME, "config", "org.acme.service", direction));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shell_configuration_never_leaves_node() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);

        let shell = [("sshPort".to_string(), "8101".to_string())].into_iter().collect();
        let acme = [("port".to_string(), "9090".to_string())].into_iter().collect();
        assert_eq!(a.update_configuration("org.apache.karaf.shell", shell).unwrap(), 0);
        assert_eq!(a.update_configuration("org.acme", acme).unwrap(), 1);

        assert!(eventually(|| b.configurations().get("org.acme").is_some()).await);
        assert!(b.configurations().get("org.apache.karaf.shell").is_none());

        cluster.shutdown().await;
    }

    // =========================================================================
    // SCENARIO 2: SWITCH-GATED PING HANDLER
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ping_handler_switch() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);

        let off = a
            .command(CommandPayload::ManageHandlers {
                handler: Some("ping".into()),
                action: SwitchAction::Off,
            })
            .with_destination(["node-b"]);
        let report = a.execute(off).await.unwrap();
        let ResultPayload::Handlers { handlers } =
            &report.result_for(&"node-b".into()).unwrap().payload
        else {
            panic!("expected the handler listing");
        };
        assert_eq!(handlers.get("ping"), Some(&SwitchStatus::Off));

        let ping = a
            .command(CommandPayload::Ping)
            .with_destination(["node-b"])
            .with_timeout(Duration::from_millis(200));
        let report = a.execute(ping).await.unwrap();
        assert!(report.is_timed_out());
        assert!(report.results.is_empty());

        let on = a
            .command(CommandPayload::ManageHandlers {
                handler: Some("ping".into()),
                action: SwitchAction::On,
            })
            .with_destination(["node-b"]);
        assert!(a.execute(on).await.unwrap().is_complete());

        let report = a
            .execute(a.command(CommandPayload::Ping).with_destination(["node-b"]))
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(
            report.result_for(&"node-b".into()).unwrap().payload,
            ResultPayload::Pong {
                node: "node-b".into()
            }
        );

        cluster.shutdown().await;
    }

    // =========================================================================
    // SCENARIO 3: ONE SILENT DESTINATION
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_partial_results_at_timeout() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);
        cluster.stop(2).await;

        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let report = a
            .execute(
                a.command(CommandPayload::Ping)
                    .with_destination(["node-b", "node-c"])
                    .with_timeout(timeout),
            )
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.completion, Completion::TimedOut);
        assert_eq!(
            report.results.keys().cloned().collect::<BTreeSet<NodeId>>(),
            BTreeSet::from(["node-b".into()])
        );
        assert_eq!(report.missing, BTreeSet::from(["node-c".into()]));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1));
        assert_eq!(a.commands().pending_count(), 0);

        cluster.shutdown().await;
    }
}
