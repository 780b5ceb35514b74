//! Domain layer.

pub mod errors;
pub mod report;
pub mod store;

pub use errors::ExecutionError;
pub use report::{Completion, ExecutionReport};
pub use store::{sweep_task, CommandStore, PendingStats};
