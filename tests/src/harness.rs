//! # Test Cluster
//!
//! Starts several nodes on one fabric. Nodes record their membership in the
//! fabric's maps, so every node sees every other one in the default group
//! as soon as it is assembled.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::{ClusterFabric, ClusterNode, NodeConfig, NodeRuntime};

/// Default command timeout of harness nodes.
pub const TEST_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Running nodes sharing one fabric.
pub struct TestCluster {
    fabric: ClusterFabric,
    runtimes: Vec<NodeRuntime>,
}

impl TestCluster {
    /// Start one node per id.
    pub async fn start(ids: &[&str]) -> Self {
        let mut cluster = Self {
            fabric: ClusterFabric::default(),
            runtimes: Vec::new(),
        };
        for id in ids {
            cluster.add_node(id).await;
        }
        cluster
    }

    /// Start one more node. The others see it in the default group.
    pub async fn add_node(&mut self, id: &str) -> Arc<ClusterNode> {
        let runtime = NodeRuntime::new(Self::config(id, self.runtimes.len()), self.fabric.clone())
            .expect("node assembly failed");
        runtime.start().await.expect("node start failed");
        let node = runtime.node();
        self.runtimes.push(runtime);
        node
    }

    fn config(id: &str, index: usize) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.node.id = id.to_string();
        config.node.port = 5701 + index as u16;
        config.commands.timeout_ms = TEST_COMMAND_TIMEOUT.as_millis() as u64;
        config.commands.sweep_interval_ms = 50;
        config
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Arc<ClusterNode> {
        self.runtimes[index].node()
    }

    #[must_use]
    pub fn fabric(&self) -> &ClusterFabric {
        &self.fabric
    }

    /// Stop one node. The others keep it in their membership view.
    pub async fn stop(&self, index: usize) {
        self.runtimes[index].shutdown().await;
    }

    pub async fn shutdown(self) {
        for runtime in &self.runtimes {
            if runtime.is_running() {
                runtime.shutdown().await;
            }
        }
    }
}

/// Poll `check` for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
