//! Domain layer.

pub mod registry;

pub use registry::{DispatchReport, DispatchStats, EventHandlerRegistry, HandlerInfo};
