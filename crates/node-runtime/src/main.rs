//! # Cluster Node
//!
//! Entry point of a single cluster node.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics from `CS_*` variables
//! 2. Load the node configuration (`CS_CONFIG` file plus overrides)
//! 3. Assemble the node on an in-process fabric
//! 4. Start background tasks and run the initial configuration sync
//! 5. Wait for Ctrl+C, then shut down

use anyhow::{Context, Result};
use cluster_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{load_config, ClusterFabric, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = load_config().context("Failed to load node configuration")?;
    let fabric = ClusterFabric::new(config.bus.capacity);

    let runtime = NodeRuntime::new(config, fabric).context("Failed to assemble node")?;
    runtime.start().await.context("Failed to start node")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
