//! # Cluster Commands
//!
//! Two-way, correlated messages: a command goes out to a set of nodes and
//! each node answers with one result carrying the command's correlation id.
//!
//! ## Lifecycle
//!
//! ```text
//! execute(cmd)
//!   ├─ resolve destinations (explicit set or group members)
//!   ├─ CommandStore::submit(id, destinations, timeout)
//!   ├─ producer.produce(forced command event)
//!   │        ...remote CommandEventHandler runs the CommandHandler
//!   │        ...and produces a result addressed back to us
//!   ├─ ResultHandler → CommandStore::on_response(result)
//!   └─ report: all responded, or timed out with partial results
//! ```
//!
//! A remote failure or panic becomes a `Failed` result for that node; it
//! never fails the whole execution.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{sweep_task, CommandStore, Completion, ExecutionError, ExecutionReport, PendingStats};
pub use ports::{CommandHandler, ExecutionContext};
pub use service::{
    ClusteredExecutionContext, CommandEventHandler, ManageGroupHandler, ManageHandlersHandler,
    PingHandler, ResultHandler, SwitchCommandHandler, RESULT_HANDLER_ID,
};
