//! uavrelay Core
//!
//! Stable types and collaborator contracts for the bidirectional telemetry
//! router: link and object identifiers, the `Event` queued on each link, the
//! retry policy and configuration, the error taxonomy, and the traits the
//! router consumes from the transport session, byte ports, the object store
//! and polled input sources. The task engine lives in `uavrelay-runtime`.

extern crate alloc;

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod event;
pub mod input;
pub mod object_store;
pub mod port;
pub mod stats;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{LinkSettings, PollerConfig, RetryPolicy, RouterConfig, RxConfig};
pub use errors::{
    ConfigError, PortError, RelayError, RelayResult, Result, StoreError, TransportError,
};
pub use event::{ChangeKind, ChangeNotification, Event, EventKind, Outcome};
pub use input::{DebugSink, InputSource, PollDiagnostics, TracingDebugSink};
pub use object_store::{AccessMode, ChangeCallback, ObjectMetadata, ObjectStore};
pub use port::{BytePort, Port};
pub use stats::{LinkStats, LinkStatsSnapshot};
pub use transport::{DecodeEvent, FrameDecoder, SessionSender};
pub use types::{InstanceId, LinkId, ObjectRef, ObjectValue, Packet, Sample};
