//! Event dispatch with bounded retries
//!
//! Turns one [`Event`] into transport calls on a link's session. Each
//! operation gets `max_retries + 1` attempts, each bounded by the policy
//! timeout. Exhausted events are counted and dropped, never requeued: a stale
//! object update must not overtake a newer one.

use std::sync::Arc;
use tokio::time::{self, Duration};
use uavrelay_core::{
    AccessMode, Event, InstanceId, ObjectRef, ObjectStore, Outcome, Packet, RelayError,
    RelayResult, RetryPolicy, Sample, SessionSender, TransportError,
};

use crate::link::Link;

use tracing::{debug, trace, warn};

/// A single transport operation, repeated on retry
#[derive(Debug)]
enum Operation {
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

/// Maps events to transport operations under a retry policy
pub struct EventDispatcher {
    policy: RetryPolicy,
    store: Option<Arc<dyn ObjectStore>>,
}

impl EventDispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            store: None,
        }
    }

    /// Object store used to commit polled samples
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Dispatch one event on `link`'s session and update its counters
    pub async fn dispatch(&self, link: &Link, event: Event) -> Outcome {
        let kind = event.kind();
        let operation = match event {
            Event::ObjectChanged {
                object,
                instance,
                ack_required,
            } => Operation::Announce {
                object,
                instance,
                ack_required,
            },
            Event::UpdateRequest { object, instance } => Operation::Request { object, instance },
            Event::ForwardRequest(packet) => Operation::Raw(packet),
            Event::PollTick { object, sample } => match self.commit_sample(object, &sample) {
                Ok(ack_required) => Operation::Announce {
                    object,
                    instance: InstanceId::FIRST,
                    ack_required,
                },
                Err(e) => {
                    warn!(link = %link.id(), %object, "failed to commit polled sample: {}", e);
                    link.stats().record_error();
                    return Outcome::Dropped;
                }
            },
        };

        let outcome = self.run_with_retries(link, &operation).await;
        trace!(link = %link.id(), %kind, ?outcome, "event dispatched");
        outcome
    }

    /// Write a polled sample into the store, returning the object's ack flag
    fn commit_sample(&self, object: ObjectRef, sample: &Sample) -> RelayResult<bool> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| RelayError::config_error("poll tick without an object store"))?;

        let mut metadata = store.get_metadata(object)?;
        if metadata.access != AccessMode::ReadWrite {
            metadata.access = AccessMode::ReadWrite;
            store.set_metadata(object, metadata)?;
        }
        store.set(object, InstanceId::FIRST, sample.to_value()?)?;
        Ok(metadata.ack_required)
    }

    async fn run_with_retries(&self, link: &Link, operation: &Operation) -> Outcome {
        let stats = link.stats();
        let timeout = self.policy.timeout();
        let max_attempts = self.policy.max_attempts();
        for attempt in 0..max_attempts {
            // Re-read per attempt so a reconfigure between retries is honoured
            let (port, session) = link.session().current();
            if port.is_disabled() {
                debug!(link = %link.id(), ?operation, attempt, "port disabled, dropping event");
                stats.record_error();
                return Outcome::Dropped;
            }
            if attempt > 0 {
                stats.record_retries(1);
            }
            match self.attempt(session.as_ref(), operation, timeout).await {
                Ok(()) => {
                    stats.record_sent();
                    return if attempt == 0 {
                        Outcome::Sent
                    } else {
                        Outcome::SentAfterRetries(attempt)
                    };
                }
                Err(e) => {
                    debug!(link = %link.id(), attempt, "transport attempt failed: {}", e);
                }
            }
        }

        warn!(link = %link.id(), ?operation, "event dropped, transport did not complete");
        stats.record_error();
        Outcome::Dropped
    }

    async fn attempt(
        &self,
        session: &dyn SessionSender,
        operation: &Operation,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let call = async {
            match operation {
                Operation::Announce {
                    object,
                    instance,
                    ack_required,
                } => {
                    session
                        .encode_and_send(*object, *instance, *ack_required, timeout)
                        .await
                }
                Operation::Request { object, instance } => {
                    session
                        .encode_request_and_send(*object, *instance, timeout)
                        .await
                }
                Operation::Raw(packet) => session.send_raw(packet).await,
            }
        };

        match time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
