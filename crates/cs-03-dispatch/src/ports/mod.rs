//! Ports layer.

pub mod inbound;
pub mod outbound;

pub use inbound::EventHandler;
pub use outbound::{EventProducer, ProduceOutcome};
