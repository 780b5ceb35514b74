//! Telemetry configuration.

use crate::TelemetryError;

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// `EnvFilter` directive, e.g. `info` or `cs_04_commands=debug,info`
    pub log_level: String,
    pub json_logs: bool,
    pub console_output: bool,
}

impl TelemetryConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("CS_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("CS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("CS_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.json_logs),
            console_output: lookup("CS_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.console_output),
        }
    }

    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// # Errors
    ///
    /// `Config` if the service name is blank.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.service_name.trim().is_empty() {
            return Err(TelemetryError::Config("service name is empty".into()));
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cluster-node".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
