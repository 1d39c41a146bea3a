//! Transport session contract
//!
//! The object-transport protocol (framing, CRC, encode/decode) lives outside
//! the router. A session bound to one port is split into two halves that touch
//! disjoint state:
//!
//! - [`SessionSender`]: the send side, driven only by the link's sender task
//! - [`FrameDecoder`]: the receive-side decode state machine, owned by the
//!   link's receiver task
//!
//! Because the halves never share buffers, a link's sender and receiver need
//! no lock between them.

use async_trait::async_trait;
use core::time::Duration;

use crate::errors::TransportError;
use crate::types::{InstanceId, ObjectRef, Packet};

// ----------------------------------------------------------------------------
// Send Side
// ----------------------------------------------------------------------------

/// Send half of a transport session
///
/// Each call is one attempt. Calls block (asynchronously) until the transport
/// reports completion or `timeout` elapses; they do not return early on
/// ambiguous states. The router additionally bounds every call by the retry
/// policy timeout.
#[async_trait]
pub trait SessionSender: Send + Sync {
    /// Encode the current value of an object and send it.
    ///
    /// With `ack_required` the call completes only once the remote side
    /// acknowledges; otherwise it completes once the frame is written.
    async fn encode_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        ack_required: bool,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Ask the remote side to send its current value of an object
    async fn encode_request_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Write an already-framed packet verbatim (no acknowledgement semantics)
    async fn send_raw(&self, packet: &Packet) -> Result<(), TransportError>;
}

// ----------------------------------------------------------------------------
// Receive Side
// ----------------------------------------------------------------------------

/// Result of feeding one byte into the decode state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// More bytes are needed
    Incomplete,
    /// A full packet was framed; the decoder is ready for the next frame
    Complete(Packet),
    /// The in-progress frame was discarded; the decoder resynchronises itself
    Error,
}

/// Receive half of a transport session
pub trait FrameDecoder: Send {
    /// Feed exactly one byte
    fn feed_byte(&mut self, byte: u8) -> DecodeEvent;

    /// Drop any partial frame (called after the link is reconfigured)
    fn reset(&mut self);
}
