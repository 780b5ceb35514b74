//! # Shared Types Crate
//!
//! Domain values shared by every cluster subsystem: node identity, event
//! direction, on/off switches, correlation ids and the command/result
//! payloads carried by the event bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Types that cross crate boundaries live here.
//! - **Identity by Key**: Nodes compare by id. Switches compare by the
//!   state they control, which a `SwitchBoard` shares per switch id.
//! - **Serializable Payloads**: Everything carried by an event implements
//!   `Serialize`/`Deserialize` so a wire transport can be plugged in.

pub mod correlation;
pub mod entities;
pub mod errors;
pub mod ipc;
pub mod switch;

pub use correlation::CorrelationId;
pub use entities::*;
pub use errors::*;
pub use ipc::*;
pub use switch::{Switch, SwitchBoard, SwitchStatus};
