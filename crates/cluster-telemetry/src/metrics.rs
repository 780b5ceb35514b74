//! Prometheus metrics for cluster nodes.
//!
//! All metrics follow the naming convention `cs_<area>_<metric>` and carry a
//! `node` label, so several nodes in one process share the registry.
//!
//! Components count with plain atomics. The runtime copies those counters
//! into the gauges below through [`record_snapshot`].

use lazy_static::lazy_static;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Cluster events by outcome
    pub static ref EVENTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cs_events", "Cluster events seen by the node, by outcome"),
        &["node", "outcome"]  // outcome: published/switched_off/denied/accepted/not_addressed/dispatched
    ).expect("metric creation failed");

    /// Handler invocations by outcome
    pub static ref HANDLER_INVOCATIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cs_handler_invocations", "Local handler invocations, by outcome"),
        &["node", "outcome"]  // outcome: invoked/skipped/failed
    ).expect("metric creation failed");

    // =========================================================================
    // COMMAND METRICS
    // =========================================================================

    /// Commands by completion
    pub static ref COMMANDS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cs_commands", "Commands executed from the node, by completion"),
        &["node", "outcome"]  // outcome: submitted/completed/timed_out/cancelled/late_results
    ).expect("metric creation failed");

    /// Commands still waiting for results
    pub static ref COMMANDS_PENDING: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cs_commands_pending", "Commands waiting for results"),
        &["node"]
    ).expect("metric creation failed");

    // =========================================================================
    // FILTER METRICS
    // =========================================================================

    /// Resource filter decisions
    pub static ref FILTER_DECISIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cs_filter_decisions", "Resource filter decisions"),
        &["node", "decision"]  // decision: allowed/denied
    ).expect("metric creation failed");
}

/// Counter values of one node at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub node: String,
    pub events_published: u64,
    pub events_switched_off: u64,
    pub events_denied: u64,
    pub events_accepted: u64,
    pub events_not_addressed: u64,
    pub events_dispatched: u64,
    pub handlers_invoked: u64,
    pub handlers_skipped: u64,
    pub handler_failures: u64,
    pub commands_submitted: u64,
    pub commands_completed: u64,
    pub commands_timed_out: u64,
    pub commands_cancelled: u64,
    pub late_results: u64,
    pub commands_pending: u64,
    pub filter_allowed: u64,
    pub filter_denied: u64,
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS.clone()),
        Box::new(HANDLER_INVOCATIONS.clone()),
        Box::new(COMMANDS.clone()),
        Box::new(COMMANDS_PENDING.clone()),
        Box::new(FILTER_DECISIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Copy `snapshot` into the gauges labelled with its node.
pub fn record_snapshot(snapshot: &NodeSnapshot) {
    let node = snapshot.node.as_str();
    let set = |vec: &IntGaugeVec, label: &str, value: u64| {
        vec.with_label_values(&[node, label]).set(clamp(value));
    };

    set(&EVENTS, "published", snapshot.events_published);
    set(&EVENTS, "switched_off", snapshot.events_switched_off);
    set(&EVENTS, "denied", snapshot.events_denied);
    set(&EVENTS, "accepted", snapshot.events_accepted);
    set(&EVENTS, "not_addressed", snapshot.events_not_addressed);
    set(&EVENTS, "dispatched", snapshot.events_dispatched);

    set(&HANDLER_INVOCATIONS, "invoked", snapshot.handlers_invoked);
    set(&HANDLER_INVOCATIONS, "skipped", snapshot.handlers_skipped);
    set(&HANDLER_INVOCATIONS, "failed", snapshot.handler_failures);

    set(&COMMANDS, "submitted", snapshot.commands_submitted);
    set(&COMMANDS, "completed", snapshot.commands_completed);
    set(&COMMANDS, "timed_out", snapshot.commands_timed_out);
    set(&COMMANDS, "cancelled", snapshot.commands_cancelled);
    set(&COMMANDS, "late_results", snapshot.late_results);
    COMMANDS_PENDING
        .with_label_values(&[node])
        .set(clamp(snapshot.commands_pending));

    set(&FILTER_DECISIONS, "allowed", snapshot.filter_allowed);
    set(&FILTER_DECISIONS, "denied", snapshot.filter_denied);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
