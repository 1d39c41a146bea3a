//! Router Event Types
//!
//! Everything a link's sender task can be asked to do arrives as an `Event`.
//! There are three producers per link: object-change callbacks, the poller,
//! and the peer link's receiver task.

use crate::types::{InstanceId, ObjectRef, Packet, Sample};
use core::fmt;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Event: producer → TxTask
// ----------------------------------------------------------------------------

/// A unit of work queued on a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A shared object's value changed and must be announced
    ObjectChanged {
        object: ObjectRef,
        instance: InstanceId,
        ack_required: bool,
    },
    /// Ask the remote side to send the current value of an object
    UpdateRequest {
        object: ObjectRef,
        instance: InstanceId,
    },
    /// An already-framed packet to retransmit verbatim
    ForwardRequest(Packet),
    /// A locally sampled value to commit and then announce
    PollTick { object: ObjectRef, sample: Sample },
}

impl Event {
    /// Short tag used in logs
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ObjectChanged { .. } => EventKind::ObjectChanged,
            Event::UpdateRequest { .. } => EventKind::UpdateRequest,
            Event::ForwardRequest(_) => EventKind::ForwardRequest,
            Event::PollTick { .. } => EventKind::PollTick,
        }
    }
}

/// Discriminant of [`Event`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ObjectChanged,
    UpdateRequest,
    ForwardRequest,
    PollTick,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::ObjectChanged => write!(f, "ObjectChanged"),
            EventKind::UpdateRequest => write!(f, "UpdateRequest"),
            EventKind::ForwardRequest => write!(f, "ForwardRequest"),
            EventKind::PollTick => write!(f, "PollTick"),
        }
    }
}

// ----------------------------------------------------------------------------
// Object Store Notifications
// ----------------------------------------------------------------------------

/// Why the object store fired a change callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Value updated by a module
    Updated,
    /// Value updated by an explicit user action
    UpdatedManual,
    /// Someone asked for a fresh copy from the remote side
    UpdateRequested,
}

/// Notification delivered by the object store's change callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub object: ObjectRef,
    pub instance: InstanceId,
    pub kind: ChangeKind,
}

impl ChangeNotification {
    /// Map a notification to the event a link should process.
    ///
    /// `ack_required` comes from the object's metadata and only matters for
    /// value updates.
    pub fn into_event(self, ack_required: bool) -> Event {
        match self.kind {
            ChangeKind::Updated | ChangeKind::UpdatedManual => Event::ObjectChanged {
                object: self.object,
                instance: self.instance,
                ack_required,
            },
            ChangeKind::UpdateRequested => Event::UpdateRequest {
                object: self.object,
                instance: self.instance,
            },
        }
    }
}

// ----------------------------------------------------------------------------
// Dispatch Outcome
// ----------------------------------------------------------------------------

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// First attempt succeeded
    Sent,
    /// Succeeded after the given number of retries
    SentAfterRetries(u32),
    /// All attempts failed (or the port is disabled); the event was dropped
    Dropped,
}

impl Outcome {
    pub fn is_sent(&self) -> bool {
        !matches!(self, Outcome::Dropped)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_mapping() {
        let object = ObjectRef::new(7);
        let updated = ChangeNotification {
            object,
            instance: InstanceId::new(2),
            kind: ChangeKind::UpdatedManual,
        };
        assert_eq!(
            updated.into_event(true),
            Event::ObjectChanged {
                object,
                instance: InstanceId::new(2),
                ack_required: true,
            }
        );

        let requested = ChangeNotification {
            object,
            instance: InstanceId::FIRST,
            kind: ChangeKind::UpdateRequested,
        };
        // ack flag is irrelevant for requests
        assert_eq!(
            requested.into_event(true),
            Event::UpdateRequest {
                object,
                instance: InstanceId::FIRST,
            }
        );
    }

    #[test]
    fn test_event_kind_display() {
        let event = Event::ForwardRequest(Packet::new(vec![1, 2, 3]));
        assert_eq!(event.kind(), EventKind::ForwardRequest);
        assert_eq!(format!("{}", event.kind()), "ForwardRequest");
    }

    #[test]
    fn test_outcome_is_sent() {
        assert!(Outcome::Sent.is_sent());
        assert!(Outcome::SentAfterRetries(2).is_sent());
        assert!(!Outcome::Dropped.is_sent());
    }
}
