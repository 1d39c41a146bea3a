//! Session senders for tests and simulation
//!
//! - [`ScriptedSender`]: each attempt follows a script (succeed, fail, stall),
//!   every attempt is recorded
//! - [`FramedSender`]: encodes operations as harness frames and writes them
//!   to a byte port

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use uavrelay_core::{
    BytePort, InstanceId, ObjectRef, Packet, PortError, SessionSender, TransportError,
};

use crate::framing::encode_frame;

/// What a scripted attempt does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    /// Fail immediately: a nack for acknowledged announces, otherwise a rejection
    Fail,
    /// Never complete; only the caller's timeout ends the attempt
    Stall,
    /// Report that the port went away
    Disabled,
}

/// One attempted transport operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentRecord {
    Announce {
        object: ObjectRef,
        instance: InstanceId,
        ack_required: bool,
    },
    Request {
        object: ObjectRef,
        instance: InstanceId,
    },
    Raw(Packet),
}

// ----------------------------------------------------------------------------
// Scripted Sender
// ----------------------------------------------------------------------------

/// Session sender driven by a per-attempt script
pub struct ScriptedSender {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    attempts: Mutex<Vec<SentRecord>>,
    delivered: Mutex<Vec<SentRecord>>,
    calls: AtomicUsize,
}

impl ScriptedSender {
    /// Every attempt succeeds
    pub fn new() -> Self {
        Self::always(Step::Succeed)
    }

    /// Every attempt does `step`
    pub fn always(step: Step) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: step,
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// The first `failures` attempts fail, later ones succeed
    pub fn failing(failures: usize) -> Self {
        Self::new().with_script(std::iter::repeat(Step::Fail).take(failures))
    }

    /// Queue steps ahead of the fallback
    pub fn with_script(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script.lock().extend(steps);
        self
    }

    /// Number of attempts made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    /// Every attempt, in order, whatever its result
    pub fn attempts(&self) -> Vec<SentRecord> {
        self.attempts.lock().clone()
    }

    /// Attempts that succeeded, in order
    pub fn delivered(&self) -> Vec<SentRecord> {
        self.delivered.lock().clone()
    }

    async fn perform(&self, record: SentRecord) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.attempts.lock().push(record.clone());
        let step = self.script.lock().pop_front().unwrap_or(self.fallback);
        match step {
            Step::Succeed => {
                self.delivered.lock().push(record);
                Ok(())
            }
            Step::Fail => Err(match record {
                SentRecord::Announce {
                    object,
                    ack_required: true,
                    ..
                } => TransportError::Nack { object },
                _ => TransportError::Rejected {
                    reason: "scripted failure".to_string(),
                },
            }),
            Step::Stall => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Step::Disabled => Err(TransportError::PortDisabled),
        }
    }
}

impl Default for ScriptedSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionSender for ScriptedSender {
    async fn encode_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        ack_required: bool,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.perform(SentRecord::Announce {
            object,
            instance,
            ack_required,
        })
        .await
    }

    async fn encode_request_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.perform(SentRecord::Request { object, instance }).await
    }

    async fn send_raw(&self, packet: &Packet) -> Result<(), TransportError> {
        self.perform(SentRecord::Raw(packet.clone())).await
    }
}

// ----------------------------------------------------------------------------
// Framed Sender
// ----------------------------------------------------------------------------

const KIND_ANNOUNCE: u8 = 0x01;
const KIND_ANNOUNCE_ACK: u8 = 0x02;
const KIND_REQUEST: u8 = 0x03;

/// Session sender writing harness frames to a byte port.
///
/// There is no remote peer to acknowledge anything, so an announce that
/// requires an ack completes once written.
pub struct FramedSender {
    port: Arc<dyn BytePort>,
}

impl FramedSender {
    pub fn new(port: Arc<dyn BytePort>) -> Self {
        Self { port }
    }

    fn header(kind: u8, object: ObjectRef, instance: InstanceId) -> Vec<u8> {
        let mut payload = Vec::with_capacity(7);
        payload.push(kind);
        payload.extend_from_slice(&object.raw().to_le_bytes());
        payload.extend_from_slice(&instance.raw().to_le_bytes());
        payload
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut offset = 0;
        while offset < bytes.len() {
            match self.port.write(&bytes[offset..]).await {
                Ok(0) => {
                    return Err(TransportError::Rejected {
                        reason: format!("{} accepted no bytes", self.port.name()),
                    })
                }
                Ok(count) => offset += count,
                Err(PortError::Disabled) => return Err(TransportError::PortDisabled),
                Err(PortError::Closed) => {
                    return Err(TransportError::Rejected {
                        reason: format!("{} is closed", self.port.name()),
                    })
                }
                Err(PortError::Io(e)) => return Err(TransportError::Io(e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SessionSender for FramedSender {
    async fn encode_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        ack_required: bool,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let kind = if ack_required {
            KIND_ANNOUNCE_ACK
        } else {
            KIND_ANNOUNCE
        };
        let frame = encode_frame(&Self::header(kind, object, instance))?;
        self.write_all(frame.as_bytes()).await
    }

    async fn encode_request_and_send(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let frame = encode_frame(&Self::header(KIND_REQUEST, object, instance))?;
        self.write_all(frame.as_bytes()).await
    }

    async fn send_raw(&self, packet: &Packet) -> Result<(), TransportError> {
        self.write_all(packet.as_bytes()).await
    }
}
