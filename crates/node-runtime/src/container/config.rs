//! # Node Configuration
//!
//! Settings for one cluster node, read from a TOML file and overridden from
//! the environment.
//!
//! ```toml
//! [node]
//! id = "node-a"
//! host = "10.0.0.1"
//! port = 5701
//! groups = ["default", "dev"]
//!
//! [commands]
//! timeout_ms = 5000
//!
//! [dispatch]
//! mode = "single"
//!
//! [[groups]]
//! name = "dev"
//! parent = "default"
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CS_CONFIG` | path of the TOML file |
//! | `CS_NODE_ID` | `node.id` |
//! | `CS_NODE_HOST` | `node.host` |
//! | `CS_NODE_PORT` | `node.port` |
//! | `CS_COMMAND_TIMEOUT_MS` | `commands.timeout_ms` |

use cs_01_groups::GroupDefinition;
use cs_03_dispatch::DispatchMode;
use serde::{Deserialize, Serialize};
use shared_types::{Node, DEFAULT_COMMAND_TIMEOUT, DEFAULT_GROUP_NAME};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "CS_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub commands: CommandConfig,
    pub dispatch: DispatchConfig,
    pub bus: BusConfig,
    pub metrics: MetricsConfig,
    /// Group policies applied at startup.
    pub groups: Vec<GroupDefinition>,
}

impl NodeConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// `Parse` on malformed TOML or unknown keys.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Parse` if it is not valid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Apply `CS_*` overrides found through `lookup`.
    ///
    /// # Errors
    ///
    /// `InvalidOverride` when a numeric variable does not parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(id) = lookup("CS_NODE_ID") {
            self.node.id = id;
        }
        if let Some(host) = lookup("CS_NODE_HOST") {
            self.node.host = host;
        }
        if let Some(port) = lookup("CS_NODE_PORT") {
            self.node.port = parse_override("CS_NODE_PORT", &port)?;
        }
        if let Some(timeout) = lookup("CS_COMMAND_TIMEOUT_MS") {
            self.commands.timeout_ms = parse_override("CS_COMMAND_TIMEOUT_MS", &timeout)?;
        }
        Ok(())
    }

    /// Check values the node cannot start with.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.trim().is_empty() {
            return Err(ConfigError::Invalid("node.id is empty".into()));
        }
        if self.commands.timeout_ms == 0 {
            return Err(ConfigError::Invalid("commands.timeout_ms must be positive".into()));
        }
        if self.commands.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "commands.sweep_interval_ms must be positive".into(),
            ));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Invalid("bus.capacity must be positive".into()));
        }
        if self.metrics.interval_ms == 0 {
            return Err(ConfigError::Invalid("metrics.interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// The local node described by `[node]`.
    #[must_use]
    pub fn local_node(&self) -> Node {
        Node::new(self.node.id.as_str(), self.node.host.as_str(), self.node.port)
    }
}

/// Identity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSection {
    pub id: String,
    pub host: String,
    pub port: u16,
    /// Groups the local node registers in at startup.
    pub groups: Vec<String>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: "node-1".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5701,
            groups: vec![DEFAULT_GROUP_NAME.to_string()],
        }
    }
}

/// Command execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandConfig {
    /// Timeout given to commands built by the node.
    pub timeout_ms: u64,
    /// Period of the pending-command sweeper.
    pub sweep_interval_ms: u64,
}

impl CommandConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            sweep_interval_ms: 1_000,
        }
    }
}

/// Worker layout of the event dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchModeSetting {
    #[default]
    PerKind,
    Single,
}

impl From<DispatchModeSetting> for DispatchMode {
    fn from(setting: DispatchModeSetting) -> Self {
        match setting {
            DispatchModeSetting::PerKind => DispatchMode::PerKind,
            DispatchModeSetting::Single => DispatchMode::Single,
        }
    }
}

/// Event dispatch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub mode: DispatchModeSetting,
}

/// In-process transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Events buffered per subscriber before the oldest are dropped.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Metrics refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub interval_ms: u64,
}

impl MetricsConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_ms: 5_000 }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{variable} is not a valid number: {value}")]
    InvalidOverride { variable: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load the node configuration.
///
/// Reads the file named by `CS_CONFIG` when set, otherwise starts from the
/// defaults, then applies the environment overrides and validates.
///
/// # Errors
///
/// Any `ConfigError` raised while reading, overriding or validating.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    load_config_with(|key| std::env::var(key).ok())
}

/// `load_config` reading variables through `lookup`.
pub fn load_config_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<NodeConfig, ConfigError> {
    let mut config = match lookup(CONFIG_PATH_ENV) {
        Some(path) => NodeConfig::from_file(Path::new(&path))?,
        None => NodeConfig::default(),
    };
    config.apply_overrides(&lookup)?;
    config.validate()?;
    Ok(config)
}

fn parse_override<T: std::str::FromStr>(
    variable: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            variable,
            value: value.to_string(),
        })
}
