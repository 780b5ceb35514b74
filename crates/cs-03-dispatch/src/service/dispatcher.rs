//! # Event Dispatcher
//!
//! Moves received events off the transport loop onto worker tasks.
//!
//! In `PerKind` mode each event kind gets its own FIFO worker: events of
//! one kind reach their handlers in transport order while different kinds
//! progress independently (a slow command handler never delays results).
//! `Single` mode funnels everything through one worker.

use crate::domain::EventHandlerRegistry;
use parking_lot::Mutex;
use shared_bus::{ClusterEvent, EventKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Worker layout of a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One worker per event kind.
    #[default]
    PerKind,
    /// One worker for every event.
    Single,
}

/// Hands events to registry workers.
pub struct EventDispatcher {
    registry: Arc<EventHandlerRegistry>,
    mode: DispatchMode,
    workers: Mutex<HashMap<Option<EventKind>, mpsc::UnboundedSender<ClusterEvent>>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(registry: Arc<EventHandlerRegistry>, mode: DispatchMode) -> Self {
        Self {
            registry,
            mode,
            workers: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EventHandlerRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Queue `event` on its worker, spawning the worker on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, event: ClusterEvent) {
        let key = match self.mode {
            DispatchMode::PerKind => Some(event.kind()),
            DispatchMode::Single => None,
        };

        let mut workers = self.workers.lock();
        let event = match workers.get(&key) {
            Some(sender) => match sender.send(event) {
                Ok(()) => return,
                // Worker exited, respawn below
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let sender = self.spawn_worker(key.clone());
        // A freshly spawned worker holds its receiver until the sender drops
        let _ = sender.send(event);
        workers.insert(key, sender);
    }

    fn spawn_worker(&self, key: Option<EventKind>) -> mpsc::UnboundedSender<ClusterEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClusterEvent>();
        let registry = self.registry.clone();
        debug!(kind = ?key, "Dispatch worker started");

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let report = registry.dispatch(&event);
                trace!(
                    event_id = %event.id,
                    invoked = report.invoked,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Event dispatched"
                );
            }
            debug!(kind = ?key, "Dispatch worker stopped");
        });
        tx
    }

    /// Number of live workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop accepting work. Workers drain their queues and exit.
    pub fn shutdown(&self) {
        let count = {
            let mut workers = self.workers.lock();
            let count = workers.len();
            workers.clear();
            count
        };
        debug!(workers = count, "Dispatcher shut down");
    }
}
