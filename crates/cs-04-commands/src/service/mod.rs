//! Service layer.

pub mod adapter;
pub mod context;
pub mod control;

pub use adapter::{CommandEventHandler, ResultHandler, RESULT_HANDLER_ID};
pub use context::ClusteredExecutionContext;
pub use control::{ManageGroupHandler, ManageHandlersHandler, PingHandler, SwitchCommandHandler};
