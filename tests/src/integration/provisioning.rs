//! # Bundle and Feature Provisioning
//!
//! Bundles, feature repositories and features travelling between running
//! nodes, and the policy that keeps some of them local.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cs_01_groups::ListType;
    use cs_07_bundle_sync::{bundle_map_name, BundleInfo, BundleRuntime, BundleState};
    use cs_08_features_sync::{FeaturesEventHandler, FeaturesService};
    use shared_bus::{BundleAction, DistributedMaps, BUNDLE_CATEGORY, FEATURES_CATEGORY};
    use shared_types::{EventType, DEFAULT_GROUP_NAME};

    use crate::harness::{eventually, TestCluster};

    const REPO: &str = "mvn:org.acme/features/1.0/xml/features";

    fn api() -> BundleInfo {
        BundleInfo::new("org.acme.api", "1.0", "mvn:org.acme/api/1.0")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bundle_lifecycle_reaches_every_peer() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);

        a.install_bundle(&api()).unwrap();
        a.change_bundle("org.acme.api/1.0", BundleAction::Started).unwrap();
        for index in [1, 2] {
            let bundles = cluster.node(index).bundles().clone();
            assert!(
                eventually(|| bundles
                    .get("org.acme.api/1.0")
                    .is_some_and(|b| b.state == BundleState::Active))
                .await
            );
        }

        a.change_bundle("org.acme.api/1.0", BundleAction::Uninstalled).unwrap();
        let bundles = cluster.node(2).bundles().clone();
        assert!(eventually(|| bundles.get("org.acme.api/1.0").is_none()).await);
        let map = cluster.fabric().maps().get_map(&bundle_map_name(DEFAULT_GROUP_NAME));
        assert!(map.is_empty());

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blacklisted_bundle_location_stays_local() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);
        b.groups()
            .set_list(
                DEFAULT_GROUP_NAME,
                ListType::Blacklist,
                BUNDLE_CATEGORY,
                EventType::Inbound,
                ["mvn:org.acme/*"],
            )
            .unwrap();

        a.install_bundle(&api()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(b.bundles().is_empty());

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_features_and_repositories_reach_peer() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);
        for node in [&a, &b] {
            node.features().provide("webconsole", "4.2.0");
        }

        assert_eq!(a.add_repository(REPO).unwrap(), 1);
        assert_eq!(a.install_feature("webconsole", None).unwrap(), 1);

        let features = b.features().clone();
        assert!(eventually(|| features.list_repositories() == vec![REPO.to_string()]).await);
        assert!(eventually(|| features.is_installed("webconsole", Some("4.2.0"))).await);

        a.uninstall_feature("webconsole", None).unwrap();
        assert!(eventually(|| !features.is_installed("webconsole", None)).await);
        a.remove_repository(REPO);
        assert!(eventually(|| features.list_repositories().is_empty()).await);

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_joiner_pulls_features_then_bundles() {
        let mut cluster = TestCluster::start(&["node-a"]).await;
        let a = cluster.node(0);
        a.features().provide("webconsole", "4.2.0");
        a.add_repository(REPO).unwrap();
        a.install_feature("webconsole", None).unwrap();
        a.install_bundle(&api()).unwrap();

        let b = cluster.add_node("node-b").await;
        assert!(b.features().list_repositories().contains(&REPO.to_string()));
        assert!(b.bundles().get("org.acme.api/1.0").is_some());
        // The feature is only known once its repository provides it
        assert!(!b.features().is_installed("webconsole", None));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_feature_sync_disabled_group_not_pulled() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        let b = cluster.node(1);
        b.groups()
            .set_sync(DEFAULT_GROUP_NAME, FEATURES_CATEGORY, false)
            .unwrap();
        // Only the synchronizer may bring the feature over
        assert!(b.switches().turn_off(FeaturesEventHandler::NAME));
        a.features().provide("webconsole", "4.2.0");
        b.features().provide("webconsole", "4.2.0");
        a.install_feature("webconsole", None).unwrap();

        let summary = b.features_sync().sync_all().unwrap();
        assert_eq!(summary.groups, 0);
        assert!(!b.features().is_installed("webconsole", None));

        cluster.shutdown().await;
    }
}
