//! # Inbound Port - EventHandler
//!
//! Contract implemented by everything that reacts to cluster events.

use shared_bus::{ClusterEvent, EventKind};
use shared_types::{HandlerError, Switch};

/// A local reaction to one kind of cluster event.
///
/// Handlers are bound to an `EventHandlerRegistry` under the kind they
/// declare. The registry only invokes a handler while its switch is ON.
pub trait EventHandler: Send + Sync {
    /// Stable name, used by operators to address the handler.
    fn name(&self) -> &str;

    /// Kind of event this handler consumes.
    fn kind(&self) -> EventKind;

    /// Gate consulted before every invocation.
    fn switch(&self) -> &Switch;

    /// Apply the event locally.
    ///
    /// # Errors
    ///
    /// Failures are logged by the registry and never reach sibling handlers.
    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError>;
}
