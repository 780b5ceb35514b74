//! Log subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global `tracing` subscriber described by `config`.
///
/// # Errors
///
/// `LoggingInit` if the filter directive is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    config.validate()?;
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    if !config.console_output {
        return tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()));
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    }
    .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
