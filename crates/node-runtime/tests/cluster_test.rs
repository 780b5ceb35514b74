//! Multi-node tests running several `NodeRuntime`s on one fabric.

use std::time::Duration;

use cs_04_commands::Completion;
use cs_07_bundle_sync::{BundleInfo, BundleRuntime, BundleState};
use cs_08_features_sync::FeaturesService;
use node_runtime::{ClusterFabric, NodeConfig, NodeRuntime};
use shared_bus::BundleAction;
use shared_types::{
    CommandPayload, GroupAction, ResultPayload, SwitchAction, SwitchStatus, DEFAULT_GROUP_NAME,
};

fn config(id: &str, port: u16) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.node.id = id.to_string();
    config.node.port = port;
    config.commands.timeout_ms = 2_000;
    config.commands.sweep_interval_ms = 50;
    config
}

/// Start `ids` on one fabric. Each node sees the others through the shared
/// membership map.
async fn cluster(ids: &[&str]) -> Vec<NodeRuntime> {
    let fabric = ClusterFabric::default();
    let mut runtimes = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        let runtime = NodeRuntime::new(config(id, 5701 + i as u16), fabric.clone()).unwrap();
        runtime.start().await.unwrap();
        runtimes.push(runtime);
    }
    runtimes
}

async fn shutdown(runtimes: Vec<NodeRuntime>) {
    for runtime in runtimes {
        runtime.shutdown().await;
    }
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_default_group() {
    let runtimes = cluster(&["node-a", "node-b", "node-c"]).await;
    let a = runtimes[0].node();

    let report = a.execute(a.command(CommandPayload::Ping)).await.unwrap();
    assert_eq!(report.completion, Completion::AllResponded);
    assert_eq!(report.results.len(), 3);
    for id in ["node-a", "node-b", "node-c"] {
        let result = report.result_for(&id.into()).unwrap();
        assert_eq!(result.payload, ResultPayload::Pong { node: id.into() });
    }

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_producer_switch_off() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    let b = runtimes[1].node();

    let command = a
        .command(CommandPayload::ProducerSwitch {
            action: SwitchAction::Off,
        })
        .with_destination(["node-b"]);
    let report = a.execute(command).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        report.result_for(&"node-b".into()).unwrap().payload,
        ResultPayload::Switch {
            status: SwitchStatus::Off
        }
    );
    assert!(!cs_03_dispatch::EventProducer::switch(b.producer().as_ref()).is_on());

    // A producer switched off still answers commands.
    let report = a
        .execute(a.command(CommandPayload::Ping).with_destination(["node-b"]))
        .await
        .unwrap();
    assert!(report.is_complete());

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_configuration_reaches_peer() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    let b = runtimes[1].node();

    let props = [
        ("service.pid".to_string(), "org.acme".to_string()),
        ("port".to_string(), "9090".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(a.update_configuration("org.acme", props).unwrap(), 1);

    let store = b.configurations().clone();
    assert!(
        eventually(|| {
            cs_05_config_sync::ConfigurationStore::get(store.as_ref(), "org.acme")
                .is_some_and(|p| p.get("port").map(String::as_str) == Some("9090"))
        })
        .await
    );

    assert_eq!(a.delete_configuration("org.acme"), 1);
    assert!(
        eventually(|| cs_05_config_sync::ConfigurationStore::get(store.as_ref(), "org.acme")
            .is_none())
        .await
    );

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blacklisted_configuration_stays_local() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    let b = runtimes[1].node();

    let props = [("idleTimeout".to_string(), "1800000".to_string())]
        .into_iter()
        .collect();
    assert_eq!(a.update_configuration("org.apache.karaf.shell", props).unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        cs_05_config_sync::ConfigurationStore::get(b.configurations().as_ref(), "org.apache.karaf.shell")
            .is_none()
    );

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_peer_times_out() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    runtimes[1].shutdown().await;

    let command = a
        .command(CommandPayload::Ping)
        .with_timeout(Duration::from_millis(200));
    let report = a.execute(command).await.unwrap();
    assert!(report.is_timed_out());
    assert!(report.result_for(&"node-a".into()).is_some());
    assert!(report.missing.contains(&"node-b".into()));

    runtimes[0].shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_joiner_pulls_existing_configuration() {
    let fabric = ClusterFabric::default();
    let a = NodeRuntime::new(config("node-a", 5701), fabric.clone()).unwrap();
    a.start().await.unwrap();
    let props = [("port".to_string(), "9090".to_string())].into_iter().collect();
    a.node().update_configuration("org.acme", props).unwrap();

    let b = NodeRuntime::new(config("node-b", 5702), fabric.clone()).unwrap();
    let summary = b.start().await.unwrap();
    assert_eq!(summary.pulled, 1);
    assert!(
        cs_05_config_sync::ConfigurationStore::get(b.node().configurations().as_ref(), "org.acme")
            .is_some()
    );

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_started_node_is_a_default_member() {
    let runtimes = cluster(&["node-a", "node-b", "node-c"]).await;
    for runtime in &runtimes {
        let members = runtime.node().groups().members(DEFAULT_GROUP_NAME).unwrap();
        assert_eq!(members.len(), 3);
    }
    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_join_visible_to_sender() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();

    let command = a
        .command(CommandPayload::ManageGroup {
            action: GroupAction::Join,
            group: Some("dev".into()),
        })
        .with_destination(["node-b"]);
    assert!(a.execute(command).await.unwrap().is_complete());

    let dev = a.groups().find_group_by_name("dev").unwrap();
    assert!(dev.members().iter().any(|n| n.id().as_str() == "node-b"));

    let report = a
        .execute(a.command(CommandPayload::Ping).with_group("dev"))
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(
        report.result_for(&"node-b".into()).unwrap().payload,
        ResultPayload::Pong {
            node: "node-b".into()
        }
    );

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bundle_start_reaches_peer() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    let b = runtimes[1].node();

    let bundle = BundleInfo::new("org.acme.api", "1.0", "mvn:org.acme/api/1.0");
    a.install_bundle(&bundle).unwrap();
    a.change_bundle("org.acme.api/1.0", BundleAction::Started).unwrap();

    let bundles = b.bundles().clone();
    assert!(
        eventually(|| bundles
            .get("org.acme.api/1.0")
            .is_some_and(|info| info.state == BundleState::Active))
        .await
    );

    shutdown(runtimes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_feature_install_reaches_peer() {
    let runtimes = cluster(&["node-a", "node-b"]).await;
    let a = runtimes[0].node();
    let b = runtimes[1].node();
    a.features().provide("webconsole", "4.2.0");
    b.features().provide("webconsole", "4.2.0");

    a.add_repository("mvn:org.acme/features/1.0/xml/features").unwrap();
    a.install_feature("webconsole", None).unwrap();

    let features = b.features().clone();
    assert!(eventually(|| features.is_installed("webconsole", Some("4.2.0"))).await);
    assert!(
        eventually(|| features
            .list_repositories()
            .contains(&"mvn:org.acme/features/1.0/xml/features".to_string()))
        .await
    );

    a.uninstall_feature("webconsole", None).unwrap();
    assert!(eventually(|| !features.is_installed("webconsole", None)).await);

    shutdown(runtimes).await;
}
