//! # Event Handler Registry
//!
//! Handlers bound by the event kind they declare. Dispatch looks up every
//! handler of the event's kind and invokes those whose switch is ON, in
//! bind order.
//!
//! The handler lists are copied out under the read lock and invoked after
//! the lock is released, so a handler may bind or unbind handlers without
//! deadlocking and a slow handler never blocks `bind`.

use crate::ports::EventHandler;
use parking_lot::RwLock;
use shared_bus::{ClusterEvent, EventKind};
use shared_types::SwitchStatus;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that ran and returned Ok.
    pub invoked: usize,
    /// Handlers skipped because their switch is OFF.
    pub skipped: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Handlers that were called, whatever the outcome.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.invoked + self.failed
    }
}

/// Listing entry for management tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub name: String,
    pub kind: EventKind,
    pub status: SwitchStatus,
}

/// Lifetime counters of the registry.
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub events_dispatched: AtomicU64,
    pub handlers_invoked: AtomicU64,
    pub handlers_skipped: AtomicU64,
    pub handler_failures: AtomicU64,
    pub unhandled_events: AtomicU64,
}

/// Kind-keyed registry of local event handlers.
#[derive(Default)]
pub struct EventHandlerRegistry {
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    stats: DispatchStats,
}

impl EventHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler under its declared kind.
    ///
    /// A handler with the same name already bound to the kind is replaced in
    /// place. Returns true when the handler is new.
    pub fn bind(&self, handler: Arc<dyn EventHandler>) -> bool {
        let kind = handler.kind();
        let name = handler.name().to_string();
        let mut handlers = self.handlers.write();
        let bound = handlers.entry(kind.clone()).or_default();

        if let Some(slot) = bound.iter_mut().find(|h| h.name() == name) {
            *slot = handler;
            debug!(handler = %name, kind = %kind, "Handler rebound");
            return false;
        }
        bound.push(handler);
        info!(handler = %name, kind = %kind, "Handler bound");
        true
    }

    /// Remove a handler. Returns false if it was not bound.
    pub fn unbind(&self, handler: &dyn EventHandler) -> bool {
        self.unbind_named(&handler.kind(), handler.name())
    }

    /// Remove the handler called `name` from `kind`.
    pub fn unbind_named(&self, kind: &EventKind, name: &str) -> bool {
        let mut handlers = self.handlers.write();
        let Some(bound) = handlers.get_mut(kind) else {
            return false;
        };
        let before = bound.len();
        bound.retain(|h| h.name() != name);
        let removed = bound.len() != before;
        if bound.is_empty() {
            handlers.remove(kind);
        }
        if removed {
            info!(handler = name, kind = %kind, "Handler unbound");
        }
        removed
    }

    /// Handlers bound to `kind`, in bind order.
    #[must_use]
    pub fn handlers_for(&self, kind: &EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.handlers.read().get(kind).cloned().unwrap_or_default()
    }

    /// First handler called `name`, whatever its kind.
    #[must_use]
    pub fn find_handler(&self, name: &str) -> Option<Arc<dyn EventHandler>> {
        let handlers = self.handlers.read();
        let mut kinds: Vec<&EventKind> = handlers.keys().collect();
        kinds.sort();
        kinds
            .into_iter()
            .flat_map(|k| handlers[k].iter())
            .find(|h| h.name() == name)
            .cloned()
    }

    /// Every bound handler, ordered by kind then bind order.
    #[must_use]
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        let handlers = self.handlers.read();
        let mut kinds: Vec<&EventKind> = handlers.keys().collect();
        kinds.sort();
        kinds
            .into_iter()
            .flat_map(|k| handlers[k].iter())
            .map(|h| HandlerInfo {
                name: h.name().to_string(),
                kind: h.kind(),
                status: h.switch().status(),
            })
            .collect()
    }

    /// Deliver `event` to every handler of its kind whose switch is ON.
    ///
    /// Errors and panics are contained per handler.
    pub fn dispatch(&self, event: &ClusterEvent) -> DispatchReport {
        let kind = event.kind();
        let handlers = self.handlers_for(&kind);
        self.stats.events_dispatched.fetch_add(1, Ordering::Relaxed);

        if handlers.is_empty() {
            self.stats.unhandled_events.fetch_add(1, Ordering::Relaxed);
            trace!(kind = %kind, event_id = %event.id, "No handler bound for event");
            return DispatchReport::default();
        }

        let mut report = DispatchReport::default();
        for handler in handlers {
            if !handler.switch().is_on() {
                report.skipped += 1;
                trace!(handler = handler.name(), kind = %kind, "Handler switched off, skipping");
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => report.invoked += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        handler = handler.name(),
                        kind = %kind,
                        event_id = %event.id,
                        error = %e,
                        "Handler failed"
                    );
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        handler = handler.name(),
                        kind = %kind,
                        event_id = %event.id,
                        panic = panic_message(panic.as_ref()),
                        "Handler panicked"
                    );
                }
            }
        }

        self.stats
            .handlers_invoked
            .fetch_add(report.invoked as u64, Ordering::Relaxed);
        self.stats
            .handlers_skipped
            .fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.stats
            .handler_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        report
    }

    #[must_use]
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
