//! UAV Relay Runtime
//!
//! The routing engine: two links, each with a bounded event queue drained by
//! a sender task and a receiver task that relays decoded packets to the other
//! link. Also hosts the periodic input poller.
//!
//! `uavrelay-core` defines the types and the seams (ports, sessions, object
//! store, input source); this crate wires them together and runs them.

pub mod builder;
pub mod link;
pub mod logic;
pub mod poller;
pub mod router;
pub mod tasks;

pub use builder::RouterBuilder;
pub use link::{EventReceiver, Link, LinkHandle, SessionSlot};
pub use logic::EventDispatcher;
pub use poller::Poller;
pub use router::{LinkConfig, Router, RouterHandle};
pub use tasks::{RxTask, TxTask};

// Re-export core types for convenience
pub use uavrelay_core::{
    Event, LinkId, LinkStatsSnapshot, Outcome, Port, RelayError, RelayResult, RouterConfig,
};
