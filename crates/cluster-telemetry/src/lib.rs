//! # Cluster Telemetry
//!
//! Ambient observability for a cluster node.
//!
//! - **Logs**: `tracing` events rendered as text or JSON lines
//! - **Metrics**: per-node Prometheus gauges fed from component counters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cluster_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! tracing::info!(group = "default", "Node joined");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `CS_SERVICE_NAME` | `cluster-node` | Name attached to the startup log |
//! | `CS_LOG_LEVEL` | `RUST_LOG`, then `info` | `EnvFilter` directive |
//! | `CS_JSON_LOGS` | `false` | JSON log lines instead of text |
//! | `CS_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, record_snapshot, register_metrics, NodeSnapshot};

use thiserror::Error;

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Keeps telemetry alive for the lifetime of the node.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Telemetry shut down");
    }
}

/// Install the log subscriber and register the node metrics.
///
/// # Errors
///
/// Fails if a global subscriber is already installed, the log filter does
/// not parse, or a metric cannot be registered.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(config)?;
    register_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}
