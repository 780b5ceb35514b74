//! # Cluster Node
//!
//! Holds every component of one node and wires them together.
//!
//! ## Assembly Order
//!
//! ```text
//! GroupManager ─→ FilteringEngine ─→ BusProducer ─→ ClusteredExecutionContext
//!      │                                  │                    │
//!      │          EventHandlerRegistry ←──┼── control handlers, ResultHandler,
//!      │                 │                │   sync handlers    RemoteServiceClient
//!      │          EventDispatcher ←── EventConsumer
//!      └──────────────────────────→ configuration, bundle and features synchronizers
//! ```
//!
//! Nodes built on the same `ClusterFabric` see each other's events and share
//! the distributed maps, group membership included.
//!
//! Every switch of the node comes from one `SwitchBoard`: the producer, the
//! consumer and each built-in handler are registered under their own id.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cluster_telemetry::NodeSnapshot;
use cs_01_groups::{GroupDefinition, GroupError, GroupManager};
use cs_02_filtering::FilteringEngine;
use cs_03_dispatch::{
    BusProducer, EventConsumer, EventDispatcher, EventHandler, EventHandlerRegistry, EventProducer,
    CONSUMER_SWITCH_ID, PRODUCER_SWITCH_ID,
};
use cs_04_commands::{
    ClusteredExecutionContext, CommandEventHandler, CommandHandler, CommandStore, ExecutionContext,
    ExecutionError, ExecutionReport, ManageGroupHandler, ManageHandlersHandler, PingHandler,
    ResultHandler, SwitchCommandHandler, RESULT_HANDLER_ID,
};
use cs_05_config_sync::{
    ConfigSyncError, ConfigurationEventHandler, ConfigurationStore, ConfigurationSynchronizer,
    InMemoryConfigurationStore, Properties,
};
use cs_06_remote_services::{
    EndpointRegistry, RemoteServiceCallHandler, RemoteServiceClient, RemoteServiceError,
};
use cs_07_bundle_sync::{
    BundleEventHandler, BundleInfo, BundleRuntime, BundleSyncError, BundleSynchronizer,
    InMemoryBundleRuntime,
};
use cs_08_features_sync::{
    FeatureState, FeaturesEventHandler, FeaturesService, FeaturesSyncError, FeaturesSynchronizer,
    InMemoryFeaturesService, RepositoryEventHandler,
};
use shared_bus::{BundleAction, InMemoryEventBus, InMemoryMaps, RepositoryAction};
use shared_types::{Command, CommandPayload, Node, NodeId, SwitchBoard};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::container::config::{ConfigError, NodeConfig};

/// Errors raised while assembling a node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("group setup failed: {0}")]
    Group(#[from] GroupError),

    #[error("configuration sync failed: {0}")]
    Sync(#[from] ConfigSyncError),

    #[error("bundle sync failed: {0}")]
    Bundle(#[from] BundleSyncError),

    #[error("features sync failed: {0}")]
    Features(#[from] FeaturesSyncError),

    #[error("node {0} is already running")]
    AlreadyStarted(String),
}

/// Transport and distributed maps shared by the nodes of one cluster.
#[derive(Clone)]
pub struct ClusterFabric {
    bus: Arc<InMemoryEventBus>,
    maps: Arc<InMemoryMaps>,
}

impl ClusterFabric {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bus: Arc::new(InMemoryEventBus::with_capacity(capacity)),
            maps: Arc::new(InMemoryMaps::new()),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    #[must_use]
    pub fn maps(&self) -> &Arc<InMemoryMaps> {
        &self.maps
    }
}

impl Default for ClusterFabric {
    fn default() -> Self {
        Self::new(shared_bus::DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Every component of one node.
pub struct ClusterNode {
    config: NodeConfig,
    local: Node,
    fabric: ClusterFabric,
    switches: Arc<SwitchBoard>,

    // =========================================================================
    // GROUPS AND POLICY
    // =========================================================================
    groups: Arc<GroupManager>,
    filter: Arc<FilteringEngine>,

    // =========================================================================
    // EVENTS
    // =========================================================================
    registry: Arc<EventHandlerRegistry>,
    dispatcher: Arc<EventDispatcher>,
    producer: Arc<BusProducer>,
    consumer: Arc<EventConsumer>,

    // =========================================================================
    // COMMANDS
    // =========================================================================
    commands: Arc<CommandStore>,
    context: Arc<ClusteredExecutionContext>,

    // =========================================================================
    // CONFIGURATION
    // =========================================================================
    configurations: Arc<InMemoryConfigurationStore>,
    synchronizer: ConfigurationSynchronizer,

    // =========================================================================
    // BUNDLES AND FEATURES
    // =========================================================================
    bundles: Arc<InMemoryBundleRuntime>,
    bundle_sync: BundleSynchronizer,
    features: Arc<InMemoryFeaturesService>,
    features_sync: FeaturesSynchronizer,

    // =========================================================================
    // REMOTE SERVICES
    // =========================================================================
    endpoints: Arc<EndpointRegistry>,
    remote_services: RemoteServiceClient,
}

impl ClusterNode {
    /// Assemble a node on `fabric`.
    ///
    /// Applies the built-in default group policy, then the configured group
    /// definitions in order, then registers the local node in its groups.
    /// Membership is recorded in the fabric's maps, so it is visible to
    /// every other node of the fabric.
    #[instrument(name = "node_assembly", skip(config, fabric), fields(node = %config.node.id))]
    pub fn new(config: NodeConfig, fabric: ClusterFabric) -> Result<Self, NodeError> {
        config.validate()?;
        let local = config.local_node();

        let switches = Arc::new(SwitchBoard::new());
        let groups = Arc::new(GroupManager::clustered(local.clone(), fabric.maps.as_ref()));
        groups.apply_definition(&GroupDefinition::default_group())?;
        for definition in &config.groups {
            groups.apply_definition(definition)?;
        }
        for name in &config.node.groups {
            groups.register_group(name)?;
        }
        let filter = Arc::new(FilteringEngine::new(groups.clone()));

        let registry = Arc::new(EventHandlerRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            registry.clone(),
            config.dispatch.mode.into(),
        ));
        let producer = Arc::new(BusProducer::with_switch(
            fabric.bus.clone(),
            local.clone(),
            filter.clone(),
            switches.switch(PRODUCER_SWITCH_ID),
        ));
        let consumer = Arc::new(EventConsumer::with_switch(
            local.id().clone(),
            dispatcher.clone(),
            switches.switch(CONSUMER_SWITCH_ID),
        ));

        let commands = Arc::new(CommandStore::new());
        let context = Arc::new(ClusteredExecutionContext::new(
            producer.clone(),
            commands.clone(),
            groups.clone(),
        ));

        let configurations = Arc::new(InMemoryConfigurationStore::new());
        let synchronizer = ConfigurationSynchronizer::new(
            groups.clone(),
            configurations.clone(),
            fabric.maps.clone(),
            filter.clone(),
            producer.clone(),
        );

        let bundles = Arc::new(InMemoryBundleRuntime::new());
        let bundle_sync = BundleSynchronizer::new(
            groups.clone(),
            bundles.clone(),
            fabric.maps.clone(),
            filter.clone(),
            producer.clone(),
        );
        let features = Arc::new(InMemoryFeaturesService::new());
        let features_sync = FeaturesSynchronizer::new(
            groups.clone(),
            features.clone(),
            fabric.maps.clone(),
            filter.clone(),
            producer.clone(),
        );

        let endpoints = Arc::new(EndpointRegistry::new(local.id().clone(), fabric.maps.as_ref()));
        let remote_services = RemoteServiceClient::new(endpoints.clone(), context.clone())
            .with_timeout(config.commands.timeout());

        let node = Self {
            config,
            local,
            fabric,
            switches,
            groups,
            filter,
            registry,
            dispatcher,
            producer,
            consumer,
            commands,
            context,
            configurations,
            synchronizer,
            bundles,
            bundle_sync,
            features,
            features_sync,
            endpoints,
            remote_services,
        };
        node.bind_builtin_handlers();
        info!(
            node = %node.local.id(),
            address = %node.local.address(),
            groups = ?node.config.node.groups,
            "Cluster node assembled"
        );
        Ok(node)
    }

    fn bind_builtin_handlers(&self) {
        let board = &self.switches;
        let local = self.local.id();
        let events: [Arc<dyn EventHandler>; 5] = [
            Arc::new(
                ResultHandler::new(self.commands.clone())
                    .with_switch(board.switch(RESULT_HANDLER_ID)),
            ),
            Arc::new(
                ConfigurationEventHandler::new(
                    local.clone(),
                    self.configurations.clone(),
                    self.fabric.maps.clone(),
                    self.filter.clone(),
                )
                .with_switch(board.switch(ConfigurationEventHandler::NAME)),
            ),
            Arc::new(
                BundleEventHandler::new(
                    local.clone(),
                    self.bundles.clone(),
                    self.fabric.maps.clone(),
                    self.filter.clone(),
                )
                .with_switch(board.switch(BundleEventHandler::NAME)),
            ),
            Arc::new(
                FeaturesEventHandler::new(local.clone(), self.features.clone(), self.filter.clone())
                    .with_switch(board.switch(FeaturesEventHandler::NAME)),
            ),
            Arc::new(
                RepositoryEventHandler::new(local.clone(), self.features.clone())
                    .with_switch(board.switch(RepositoryEventHandler::NAME)),
            ),
        ];
        for handler in events {
            self.registry.bind(handler);
        }

        let control: [Arc<dyn CommandHandler>; 6] = [
            Arc::new(PingHandler::new(local.clone()).with_switch(board.switch(PingHandler::NAME))),
            Arc::new(
                SwitchCommandHandler::producer(self.producer.switch().clone())
                    .with_switch(board.switch(SwitchCommandHandler::PRODUCER_NAME)),
            ),
            Arc::new(
                SwitchCommandHandler::consumer(self.consumer.switch().clone())
                    .with_switch(board.switch(SwitchCommandHandler::CONSUMER_NAME)),
            ),
            Arc::new(
                ManageHandlersHandler::new(self.registry.clone())
                    .with_switch(board.switch(ManageHandlersHandler::NAME)),
            ),
            Arc::new(
                ManageGroupHandler::new(self.groups.clone())
                    .with_switch(board.switch(ManageGroupHandler::NAME)),
            ),
            Arc::new(
                RemoteServiceCallHandler::new(self.endpoints.clone())
                    .with_switch(board.switch(RemoteServiceCallHandler::NAME)),
            ),
        ];
        for handler in control {
            self.bind_command_handler(handler);
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn local_node(&self) -> &Node {
        &self.local
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[must_use]
    pub fn fabric(&self) -> &ClusterFabric {
        &self.fabric
    }

    /// Switches of the producer, the consumer and every built-in handler.
    #[must_use]
    pub fn switches(&self) -> &Arc<SwitchBoard> {
        &self.switches
    }

    #[must_use]
    pub fn groups(&self) -> &Arc<GroupManager> {
        &self.groups
    }

    #[must_use]
    pub fn filter(&self) -> &Arc<FilteringEngine> {
        &self.filter
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EventHandlerRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn producer(&self) -> &Arc<BusProducer> {
        &self.producer
    }

    #[must_use]
    pub fn consumer(&self) -> &Arc<EventConsumer> {
        &self.consumer
    }

    #[must_use]
    pub fn commands(&self) -> &Arc<CommandStore> {
        &self.commands
    }

    #[must_use]
    pub fn configurations(&self) -> &Arc<InMemoryConfigurationStore> {
        &self.configurations
    }

    #[must_use]
    pub fn synchronizer(&self) -> &ConfigurationSynchronizer {
        &self.synchronizer
    }

    #[must_use]
    pub fn bundles(&self) -> &Arc<InMemoryBundleRuntime> {
        &self.bundles
    }

    #[must_use]
    pub fn bundle_sync(&self) -> &BundleSynchronizer {
        &self.bundle_sync
    }

    #[must_use]
    pub fn features(&self) -> &Arc<InMemoryFeaturesService> {
        &self.features
    }

    #[must_use]
    pub fn features_sync(&self) -> &FeaturesSynchronizer {
        &self.features_sync
    }

    #[must_use]
    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    /// Client calling services exported by other nodes.
    #[must_use]
    pub fn remote_services(&self) -> &RemoteServiceClient {
        &self.remote_services
    }

    // =========================================================================
    // HANDLERS
    // =========================================================================

    /// Bind an event handler. Returns false if it replaced one of the same name.
    pub fn bind_handler(&self, handler: Arc<dyn EventHandler>) -> bool {
        self.registry.bind(handler)
    }

    /// Bind a command handler so remote nodes can invoke it.
    pub fn bind_command_handler(&self, handler: Arc<dyn CommandHandler>) -> bool {
        let producer: Arc<dyn EventProducer> = self.producer.clone();
        self.registry
            .bind(Arc::new(CommandEventHandler::new(handler, producer)))
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// A command carrying the node's configured timeout.
    #[must_use]
    pub fn command(&self, payload: CommandPayload) -> Command {
        Command::new(payload).with_timeout(self.config.commands.timeout())
    }

    /// Send `command` and wait for the results.
    ///
    /// # Errors
    ///
    /// See `ExecutionContext::execute`.
    pub async fn execute(&self, command: Command) -> Result<ExecutionReport, ExecutionError> {
        self.context.execute(command).await
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Store `properties` under `pid` locally and propagate the change.
    ///
    /// Returns the number of groups the change was published to.
    ///
    /// # Errors
    ///
    /// A cluster map entry that cannot be written.
    pub fn update_configuration(
        &self,
        pid: &str,
        properties: Properties,
    ) -> Result<usize, ConfigSyncError> {
        self.configurations.update(pid, properties);
        let published = self.synchronizer.on_local_change(pid)?;
        debug!(pid, published, "Local configuration updated");
        Ok(published)
    }

    /// Remove `pid` locally and propagate the removal.
    pub fn delete_configuration(&self, pid: &str) -> usize {
        if !self.configurations.delete(pid) {
            return 0;
        }
        self.synchronizer.on_local_delete(pid)
    }

    // =========================================================================
    // BUNDLES
    // =========================================================================

    /// Install `bundle` locally and propagate it.
    ///
    /// Returns the number of groups the change was published to.
    ///
    /// # Errors
    ///
    /// The local framework refused the bundle, or a cluster map entry could
    /// not be written.
    pub fn install_bundle(&self, bundle: &BundleInfo) -> Result<usize, BundleSyncError> {
        self.bundles.install(bundle)?;
        let installed = self.bundles.get(&bundle.id()).unwrap_or_else(|| bundle.clone());
        self.bundle_sync.on_local_change(&installed, BundleAction::Installed)
    }

    /// Apply `action` to the installed bundle `id` and propagate it.
    ///
    /// # Errors
    ///
    /// `NotInstalled` for an unknown id, a refused operation, or a cluster
    /// map entry that could not be written.
    pub fn change_bundle(&self, id: &str, action: BundleAction) -> Result<usize, BundleSyncError> {
        let before = self
            .bundles
            .get(id)
            .ok_or_else(|| BundleSyncError::NotInstalled(id.to_string()))?;
        match action {
            BundleAction::Installed => {}
            BundleAction::Started => self.bundles.start(id)?,
            BundleAction::Stopped => self.bundles.stop(id)?,
            BundleAction::Updated => self.bundles.update(id)?,
            BundleAction::Uninstalled => {
                self.bundles.uninstall(id)?;
            }
        }
        let after = self.bundles.get(id).unwrap_or(before);
        let published = self.bundle_sync.on_local_change(&after, action)?;
        debug!(bundle = id, ?action, published, "Local bundle changed");
        Ok(published)
    }

    // =========================================================================
    // FEATURES
    // =========================================================================

    /// Register a feature repository locally and propagate it.
    ///
    /// # Errors
    ///
    /// The url is not a valid repository location.
    pub fn add_repository(&self, url: &str) -> Result<usize, FeaturesSyncError> {
        self.features.add_repository(url)?;
        Ok(self
            .features_sync
            .on_repository_change(url, RepositoryAction::Added))
    }

    /// Remove a feature repository locally and propagate the removal.
    pub fn remove_repository(&self, url: &str) -> usize {
        if !self.features.remove_repository(url) {
            return 0;
        }
        self.features_sync
            .on_repository_change(url, RepositoryAction::Removed)
    }

    /// Install a feature locally and propagate it. Without a version the
    /// highest one provided is installed.
    ///
    /// # Errors
    ///
    /// No repository provides the feature, or a cluster map entry could not
    /// be written.
    pub fn install_feature(&self, name: &str, version: Option<&str>) -> Result<usize, FeaturesSyncError> {
        self.features.install_feature(name, version)?;
        let installed = self.installed_features(name, version);
        let mut published = 0;
        for feature in &installed {
            published += self.features_sync.on_feature_change(feature)?;
        }
        Ok(published)
    }

    /// Uninstall a feature locally and propagate it.
    ///
    /// # Errors
    ///
    /// A cluster map entry could not be written.
    pub fn uninstall_feature(&self, name: &str, version: Option<&str>) -> Result<usize, FeaturesSyncError> {
        let installed = self.installed_features(name, version);
        if !self.features.uninstall_feature(name, version) {
            return Ok(0);
        }
        let mut published = 0;
        for mut feature in installed {
            feature.installed = false;
            published += self.features_sync.on_feature_change(&feature)?;
        }
        Ok(published)
    }

    fn installed_features(&self, name: &str, version: Option<&str>) -> Vec<FeatureState> {
        self.features
            .list_features()
            .into_iter()
            .filter(|f| f.installed && f.name == name && version.map_or(true, |v| v == f.version))
            .collect()
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Forget `node` after it left the cluster: its group membership and
    /// every service it provided.
    ///
    /// Returns the number of groups it was removed from.
    pub fn node_left(&self, node: &NodeId) -> usize {
        let groups = self.groups.node_left(node);
        if let Err(e) = self.endpoints.node_left(node) {
            warn!(node = %node, error = %e, "Failed to remove departed provider");
        }
        info!(node = %node, groups, "Node left the cluster");
        groups
    }

    /// Drop providers that are no longer members of any group.
    ///
    /// # Errors
    ///
    /// An endpoint entry could not be read or written.
    pub fn prune_endpoints(&self) -> Result<usize, RemoteServiceError> {
        let active = self
            .groups
            .list_nodes()
            .iter()
            .map(|node| node.id().clone())
            .collect();
        self.endpoints.prune(&active)
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Current component counters of the node.
    #[must_use]
    pub fn snapshot(&self) -> NodeSnapshot {
        let producer = self.producer.stats();
        let consumer = self.consumer.stats();
        let dispatch = self.registry.stats();
        let pending = self.commands.stats();
        let filter = self.filter.stats();
        NodeSnapshot {
            node: self.local.id().to_string(),
            events_published: producer.published.load(Ordering::Relaxed),
            events_switched_off: producer.switched_off.load(Ordering::Relaxed)
                + consumer.switched_off.load(Ordering::Relaxed),
            events_denied: producer.denied.load(Ordering::Relaxed),
            events_accepted: consumer.accepted.load(Ordering::Relaxed),
            events_not_addressed: consumer.not_addressed.load(Ordering::Relaxed),
            events_dispatched: dispatch.events_dispatched.load(Ordering::Relaxed),
            handlers_invoked: dispatch.handlers_invoked.load(Ordering::Relaxed),
            handlers_skipped: dispatch.handlers_skipped.load(Ordering::Relaxed),
            handler_failures: dispatch.handler_failures.load(Ordering::Relaxed),
            commands_submitted: pending.total_submitted.load(Ordering::Relaxed),
            commands_completed: pending.total_completed.load(Ordering::Relaxed),
            commands_timed_out: pending.total_timeouts.load(Ordering::Relaxed),
            commands_cancelled: pending.total_cancelled.load(Ordering::Relaxed),
            late_results: pending.late_responses.load(Ordering::Relaxed),
            commands_pending: self.commands.pending_count() as u64,
            filter_allowed: filter.allowed.load(Ordering::Relaxed),
            filter_denied: filter.denied.load(Ordering::Relaxed),
        }
    }
}
