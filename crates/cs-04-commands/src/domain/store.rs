//! # Command Store
//!
//! Correlates asynchronous per-node results with the command that caused
//! them.
//!
//! Flow:
//! 1. The sender calls `submit()` with the expected responders and gets a
//!    oneshot receiver
//! 2. The command is published with its correlation id
//! 3. The result handler calls `on_response()` for every incoming result
//! 4. Once every expected node answered, or the deadline passed, the entry
//!    is removed and the report is sent to the receiver
//!
//! Completion always goes through `DashMap::remove_if`, so exactly one of
//! `on_response`, `sweep_expired`, `expire` or `cancel` wins for an entry
//! and the report is delivered at most once.

use crate::domain::{Completion, ExecutionError, ExecutionReport};
use dashmap::DashMap;
use shared_types::{CommandResult, CorrelationId, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// A command waiting for results.
struct PendingCommand {
    expected: BTreeSet<NodeId>,
    results: BTreeMap<NodeId, CommandResult>,
    created_at: Instant,
    deadline: Instant,
    sender: oneshot::Sender<ExecutionReport>,
}

impl PendingCommand {
    fn is_satisfied(&self) -> bool {
        self.expected.iter().all(|node| self.results.contains_key(node))
    }

    fn into_report(
        self,
        command_id: CorrelationId,
        completion: Completion,
    ) -> (ExecutionReport, oneshot::Sender<ExecutionReport>) {
        let missing = self
            .expected
            .iter()
            .filter(|node| !self.results.contains_key(*node))
            .cloned()
            .collect();
        let report = ExecutionReport {
            command_id,
            results: self.results,
            completion,
            missing,
        };
        (report, self.sender)
    }
}

/// Statistics for the command store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Commands registered
    pub total_submitted: AtomicU64,
    /// Commands completed by their last result
    pub total_completed: AtomicU64,
    /// Commands completed by their deadline
    pub total_timeouts: AtomicU64,
    /// Commands cancelled, or whose waiter went away
    pub total_cancelled: AtomicU64,
    /// Results for unknown or finished commands
    pub late_responses: AtomicU64,
}

/// Pending commands keyed by correlation id.
pub struct CommandStore {
    pending: DashMap<CorrelationId, PendingCommand>,
    stats: Arc<PendingStats>,
}

impl CommandStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register `id` as waiting for a result from every node in `expected`.
    ///
    /// An empty `expected` set completes immediately.
    ///
    /// # Errors
    ///
    /// `DuplicateCommand` if `id` is already pending.
    pub fn submit(
        &self,
        id: CorrelationId,
        expected: BTreeSet<NodeId>,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<ExecutionReport>, ExecutionError> {
        let (tx, rx) = oneshot::channel();
        if expected.is_empty() {
            let _ = tx.send(ExecutionReport::empty(id));
            return Ok(rx);
        }

        let now = Instant::now();
        let entry = PendingCommand {
            expected,
            results: BTreeMap::new(),
            created_at: now,
            deadline: now + timeout,
            sender: tx,
        };

        match self.pending.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!(correlation_id = %id, "Rejected duplicate command id");
                return Err(ExecutionError::DuplicateCommand(id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(
                    correlation_id = %id,
                    expected = entry.expected.len(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Registered pending command"
                );
                slot.insert(entry);
            }
        }
        self.stats.total_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    /// Fold `result` into its pending command.
    ///
    /// Returns true if the result was recorded. Results for unknown or
    /// finished commands, and from nodes that were not asked, are dropped.
    pub fn on_response(&self, result: CommandResult) -> bool {
        let id = result.command_id;
        let node = result.source_node.id().clone();

        {
            let Some(mut entry) = self.pending.get_mut(&id) else {
                self.stats.late_responses.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %id, node = %node, "Result for unknown or finished command");
                return false;
            };
            if !entry.expected.contains(&node) {
                debug!(correlation_id = %id, node = %node, "Result from unexpected node ignored");
                return false;
            }
            entry.results.insert(node.clone(), result);
            trace!(
                correlation_id = %id,
                node = %node,
                received = entry.results.len(),
                expected = entry.expected.len(),
                "Result recorded"
            );
        }

        if let Some((id, pending)) = self.pending.remove_if(&id, |_, p| p.is_satisfied()) {
            let elapsed = pending.created_at.elapsed();
            if self.deliver(id, pending, Completion::AllResponded) {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %id,
                    response_time_ms = elapsed.as_millis() as u64,
                    "Command completed"
                );
            }
        }
        true
    }

    /// Complete every command past its deadline with the results so far.
    ///
    /// Returns the number of commands completed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        let mut completed = 0;
        for id in expired {
            if let Some((id, pending)) = self.pending.remove_if(&id, |_, p| p.deadline <= now) {
                if self.time_out(id, pending) {
                    completed += 1;
                }
            }
        }
        completed
    }

    /// Complete `id` as timed out now, whatever its deadline.
    ///
    /// Returns false if it was no longer pending.
    pub fn expire(&self, id: &CorrelationId) -> bool {
        self.pending
            .remove(id)
            .is_some_and(|(id, pending)| self.time_out(id, pending))
    }

    /// Drop `id` without delivering a report. Idempotent.
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        if self.pending.remove(id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, "Pending command cancelled");
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn time_out(&self, id: CorrelationId, pending: PendingCommand) -> bool {
        let received = pending.results.len();
        let expected = pending.expected.len();
        let delivered = self.deliver(id, pending, Completion::TimedOut);
        if delivered {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(correlation_id = %id, received, expected, "Command timed out");
        }
        delivered
    }

    fn deliver(&self, id: CorrelationId, pending: PendingCommand, completion: Completion) -> bool {
        let (report, sender) = pending.into_report(id, completion);
        if sender.send(report).is_err() {
            // Waiter dropped its receiver
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, "Command waiter gone");
            return false;
        }
        true
    }
}

impl Default for CommandStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task completing expired commands.
pub async fn sweep_task(store: Arc<CommandStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let expired = store.sweep_expired();
        if expired > 0 {
            debug!(expired, "Swept expired commands");
        }
    }
}
