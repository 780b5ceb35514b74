//! # Configuration Synchronization
//!
//! Configuration changes travelling between running nodes through the
//! group's cluster map and `Configuration` events.

#[cfg(test)]
mod tests {
    use cs_03_dispatch::EventProducer;
    use cs_05_config_sync::{configuration_map_name, ConfigurationStore, Properties};
    use shared_bus::DistributedMaps;
    use shared_types::DEFAULT_GROUP_NAME;

    use crate::harness::{eventually, TestCluster};

    fn props(entries: &[(&str, &str)]) -> Properties {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_change_reaches_every_peer() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);

        a.update_configuration("org.acme", props(&[("port", "9090")]))
            .unwrap();

        for index in [1, 2] {
            let peer = cluster.node(index);
            assert!(
                eventually(|| peer.configurations().get("org.acme") == Some(props(&[("port", "9090")])))
                    .await
            );
        }

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_local_only_properties_never_shared() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);
        b.configurations().update(
            "org.acme",
            props(&[("service.pid", "org.acme"), ("felix.fileinstall.filename", "b.cfg")]),
        );

        a.update_configuration(
            "org.acme",
            props(&[
                ("service.pid", "org.acme"),
                ("felix.fileinstall.filename", "a.cfg"),
                ("port", "9090"),
            ]),
        )
        .unwrap();

        let map = cluster
            .fabric()
            .maps()
            .get_map(&configuration_map_name(DEFAULT_GROUP_NAME));
        let shared: Properties = map.get("org.acme").unwrap().unwrap();
        assert_eq!(shared, props(&[("port", "9090")]));

        let expected = props(&[
            ("service.pid", "org.acme"),
            ("felix.fileinstall.filename", "b.cfg"),
            ("port", "9090"),
        ]);
        assert!(eventually(|| b.configurations().get("org.acme") == Some(expected.clone())).await);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unchanged_configuration_not_republished() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);

        assert_eq!(
            a.update_configuration("org.acme", props(&[("port", "9090")])).unwrap(),
            1
        );
        assert_eq!(
            a.update_configuration("org.acme", props(&[("port", "9090")])).unwrap(),
            0
        );
        assert_eq!(a.snapshot().events_published, 1);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_producer_off_keeps_change_local() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);

        a.producer().switch().turn_off();
        assert_eq!(
            a.update_configuration("org.acme", props(&[("port", "9090")])).unwrap(),
            0
        );
        assert!(a.configurations().get("org.acme").is_some());

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(b.configurations().get("org.acme").is_none());

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_joiner_pulls_on_start() {
        let mut cluster = TestCluster::start(&["node-a"]).await;
        cluster
            .node(0)
            .update_configuration("org.acme", props(&[("port", "9090")]))
            .unwrap();

        let b = cluster.add_node("node-b").await;
        assert_eq!(b.configurations().get("org.acme"), Some(props(&[("port", "9090")])));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_disabled_group_not_pulled() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);
        a.update_configuration("org.acme", props(&[("port", "9090")]))
            .unwrap();
        assert!(eventually(|| b.configurations().get("org.acme").is_some()).await);

        b.configurations().delete("org.acme");
        b.groups()
            .set_sync(DEFAULT_GROUP_NAME, "config", false)
            .unwrap();
        let summary = b.synchronizer().sync_all().unwrap();
        assert_eq!(summary.groups, 0);
        assert!(b.configurations().get("org.acme").is_none());

        b.groups()
            .set_sync(DEFAULT_GROUP_NAME, "config", true)
            .unwrap();
        assert_eq!(b.synchronizer().pull(DEFAULT_GROUP_NAME).unwrap(), 1);

        cluster.shutdown().await;
    }
}
