//! # Event Dispatch
//!
//! Moves cluster events between the transport and local handlers.
//!
//! ```text
//!  transport ──► EventConsumer ──► EventDispatcher ──► EventHandlerRegistry ──► handlers
//!                 (destination,       (per-kind           (handler switch,
//!                  consumer switch)    FIFO workers)       error isolation)
//!
//!  handlers / commands ──► BusProducer ──► transport
//!                          (producer switch, outbound filter)
//! ```
//!
//! Handlers implement `EventHandler` and are bound under the event kind
//! they declare. Nothing in this crate knows concrete handler types.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{DispatchReport, DispatchStats, EventHandlerRegistry, HandlerInfo};
pub use ports::{EventHandler, EventProducer, ProduceOutcome};
pub use service::{
    BusProducer, ConsumerStats, DispatchMode, EventConsumer, EventDispatcher, ProducerStats,
    CONSUMER_SWITCH_ID, PRODUCER_SWITCH_ID,
};
