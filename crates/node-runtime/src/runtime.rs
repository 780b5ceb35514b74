//! # Node Runtime
//!
//! Lifecycle of a running node: the consumer loop, the pending-command
//! sweeper and the metrics refresher, all stopped by one shutdown signal.
//!
//! ## Startup Sequence
//!
//! 1. Subscribe to the cluster transport
//! 2. Start the consumer loop
//! 3. Start the command sweeper
//! 4. Start the metrics refresher
//! 5. Pull then push configurations, features and bundles of every local
//!    group

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cluster_telemetry::record_snapshot;
use cs_04_commands::sweep_task;
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventTransport};
use shared_types::SyncSummary;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::container::{ClusterFabric, ClusterNode, NodeConfig, NodeError};

/// Time each background task gets to finish after the shutdown signal.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A cluster node and its background tasks.
pub struct NodeRuntime {
    node: Arc<ClusterNode>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Assemble a node on `fabric`. Nothing runs until `start`.
    pub fn new(config: NodeConfig, fabric: ClusterFabric) -> Result<Self, NodeError> {
        let node = Arc::new(ClusterNode::new(config, fabric)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            node,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    #[must_use]
    pub fn node(&self) -> Arc<ClusterNode> {
        Arc::clone(&self.node)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !*self.shutdown_rx.borrow()
    }

    /// Start the background tasks and run the initial synchronization.
    ///
    /// Features are synchronized before bundles, so bundles a feature
    /// installs are already present when the bundle maps are compared.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call, `Sync`, `Features` or `Bundle` if
    /// the initial synchronization fails. The tasks keep running in the latter case.
    pub async fn start(&self) -> Result<SyncSummary, NodeError> {
        let id = self.node.local_node().id().to_string();
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(NodeError::AlreadyStarted(id));
        }
        info!(node = %id, "Starting cluster node");

        let subscription = self.node.fabric().bus().subscribe(EventFilter::all());
        let consumer = Arc::clone(self.node.consumer());
        let consumer_task = tokio::spawn(consumer.run(subscription, self.shutdown_rx.clone()));

        let store = Arc::clone(self.node.commands());
        let interval = self.node.config().commands.sweep_interval();
        let mut sweeper_shutdown = self.shutdown_rx.clone();
        let sweeper_task = tokio::spawn(async move {
            tokio::select! {
                () = sweep_task(store, interval) => {}
                _ = sweeper_shutdown.changed() => {
                    debug!("Command sweeper stopped");
                }
            }
        });

        let node = Arc::clone(&self.node);
        let period = node.config().metrics.interval();
        let mut metrics_shutdown = self.shutdown_rx.clone();
        let metrics_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => record_snapshot(&node.snapshot()),
                    _ = metrics_shutdown.changed() => break,
                }
            }
            record_snapshot(&node.snapshot());
        });

        self.tasks
            .lock()
            .extend([consumer_task, sweeper_task, metrics_task]);

        let mut summary = self.node.synchronizer().sync_all()?;
        summary += self.node.features_sync().sync_all()?;
        summary += self.node.bundle_sync().sync_all()?;
        info!(
            node = %id,
            groups = summary.groups,
            pulled = summary.pulled,
            pushed = summary.pushed,
            "Cluster node running"
        );
        Ok(summary)
    }

    /// Stop every background task.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to all tasks
    /// 2. Stop the dispatch workers
    /// 3. Wait for each task, bounded by a drain timeout
    pub async fn shutdown(&self) {
        let id = self.node.local_node().id().to_string();
        info!(node = %id, "Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        self.node.dispatcher().shutdown();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(TASK_DRAIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(node = %id, error = %e, "Background task failed"),
                Err(_) => warn!(node = %id, "Background task did not stop in time"),
            }
        }
        info!(node = %id, "Shutdown complete");
    }
}
