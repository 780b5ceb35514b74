//! Service layer.

pub mod consumer;
pub mod dispatcher;
pub mod producer;

pub use consumer::{ConsumerStats, EventConsumer, CONSUMER_SWITCH_ID};
pub use dispatcher::{DispatchMode, EventDispatcher};
pub use producer::{BusProducer, ProducerStats, PRODUCER_SWITCH_ID};
