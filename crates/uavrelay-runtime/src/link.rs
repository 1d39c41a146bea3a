//! Links: per-endpoint routing state
//!
//! A [`Link`] pairs one byte-stream port with a bounded event queue, the send
//! half of a transport session and its counters. Producers only ever see a
//! [`LinkHandle`], which exposes `enqueue` and a stats snapshot. The queue's
//! receiver goes to the link's sender task and nowhere else.

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use uavrelay_core::{
    Event, LinkId, LinkSettings, LinkStats, LinkStatsSnapshot, Port, RelayError, RelayResult,
    SessionSender,
};

use tracing::{debug, info, trace};

/// Receiving end of a link's event queue
pub type EventReceiver = mpsc::Receiver<Event>;

// ----------------------------------------------------------------------------
// Session Slot
// ----------------------------------------------------------------------------

struct SlotState {
    port: Port,
    sender: Arc<dyn SessionSender>,
}

/// Port and session sender of a link, swappable at runtime.
///
/// Guarded by a reentrant mutex so a producer that already holds the slot
/// (e.g. while reconfiguring from inside a change callback) can re-enter it.
/// Steady-state routing only takes the lock long enough to clone two `Arc`s.
pub struct SessionSlot {
    state: ReentrantMutex<RefCell<SlotState>>,
    generation: AtomicU64,
}

impl SessionSlot {
    fn new(port: Port, sender: Arc<dyn SessionSender>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(SlotState { port, sender })),
            generation: AtomicU64::new(0),
        }
    }

    /// Current port and session sender
    pub fn current(&self) -> (Port, Arc<dyn SessionSender>) {
        let guard = self.state.lock();
        let state = guard.borrow();
        (state.port.clone(), Arc::clone(&state.sender))
    }

    pub fn port(&self) -> Port {
        self.state.lock().borrow().port.clone()
    }

    /// Bumped on every reconfiguration
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn replace(&self, port: Port, sender: Arc<dyn SessionSender>) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            state.port = port;
            state.sender = sender;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Run `f` while holding the slot; nested calls from the same thread are allowed
    pub fn with_locked<R>(&self, f: impl FnOnce(&SessionSlot) -> R) -> R {
        let _guard = self.state.lock();
        f(self)
    }
}

// ----------------------------------------------------------------------------
// Link
// ----------------------------------------------------------------------------

/// Routing state for one physical connection
pub struct Link {
    id: LinkId,
    peer: LinkId,
    name: String,
    capacity: usize,
    queue: mpsc::Sender<Event>,
    stats: Arc<LinkStats>,
    session: SessionSlot,
}

impl Link {
    /// Create a link and the receiver its sender task will drain
    pub fn new(
        id: LinkId,
        settings: &LinkSettings,
        port: Port,
        sender: Arc<dyn SessionSender>,
    ) -> RelayResult<(Self, EventReceiver)> {
        if settings.queue_capacity == 0 {
            return Err(uavrelay_core::ConfigError::InvalidQueueCapacity { link: id }.into());
        }
        let (queue, receiver) = mpsc::channel(settings.queue_capacity);
        debug!(link = %id, name = %settings.name, ?port, capacity = settings.queue_capacity, "link created");
        Ok((
            Self {
                id,
                peer: id.peer(),
                name: settings.name.clone(),
                capacity: settings.queue_capacity,
                queue,
                stats: Arc::new(LinkStats::new()),
                session: SessionSlot::new(port, sender),
            },
            receiver,
        ))
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    /// The link packets decoded here are relayed to
    pub fn peer(&self) -> LinkId {
        self.peer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn session(&self) -> &SessionSlot {
        &self.session
    }

    /// Producer-facing handle
    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            id: self.id,
            capacity: self.capacity,
            queue: self.queue.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Swap the port and session sender (e.g. after a baud-rate change).
    ///
    /// Events already queued are dispatched on the new session. The receiver
    /// task notices the change at its next read timeout and resets its decoder.
    pub fn reconfigure(&self, port: Port, sender: Arc<dyn SessionSender>) {
        info!(link = %self.id, ?port, "reconfiguring link session");
        self.session.replace(port, sender);
    }
}

// ----------------------------------------------------------------------------
// Link Handle
// ----------------------------------------------------------------------------

/// Cloneable producer handle for a link's queue
#[derive(Clone)]
pub struct LinkHandle {
    id: LinkId,
    capacity: usize,
    queue: mpsc::Sender<Event>,
    stats: Arc<LinkStats>,
}

impl LinkHandle {
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Non-blocking enqueue; `false` if the queue is full (the event is dropped)
    pub fn enqueue(&self, event: Event) -> bool {
        self.try_enqueue(event).is_ok()
    }

    /// Non-blocking enqueue reporting why it failed
    pub fn try_enqueue(&self, event: Event) -> RelayResult<()> {
        let kind = event.kind();
        self.queue.try_send(event).map_err(|e| {
            self.stats.record_enqueue_dropped();
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    trace!(link = %self.id, %kind, "queue full, event dropped");
                    RelayError::QueueFull { link: self.id }
                }
                mpsc::error::TrySendError::Closed(_) => RelayError::QueueClosed { link: self.id },
            }
        })
    }

    /// Enqueue, waiting at most `wait` for a free slot
    pub async fn enqueue_timeout(&self, event: Event, wait: Duration) -> bool {
        match self.queue.send_timeout(event, wait).await {
            Ok(()) => true,
            Err(_) => {
                self.stats.record_enqueue_dropped();
                false
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots in the queue right now
    pub fn queue_free(&self) -> usize {
        self.queue.capacity()
    }

    pub fn stats(&self) -> LinkStatsSnapshot {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHandle")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("queue_free", &self.queue.capacity())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uavrelay_core::{InstanceId, ObjectRef, Packet, TransportError};

    struct NullSender;

    #[async_trait]
    impl SessionSender for NullSender {
        async fn encode_and_send(
            &self,
            _object: ObjectRef,
            _instance: InstanceId,
            _ack_required: bool,
            _timeout: Duration,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn encode_request_and_send(
            &self,
            _object: ObjectRef,
            _instance: InstanceId,
            _timeout: Duration,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_raw(&self, _packet: &Packet) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn tagged(n: u32) -> Event {
        Event::UpdateRequest {
            object: ObjectRef::new(n),
            instance: InstanceId::FIRST,
        }
    }

    #[tokio::test]
    async fn test_full_queue_rejects_and_keeps_order() {
        let settings = LinkSettings::new("test", 2);
        let (link, mut receiver) =
            Link::new(LinkId::GROUND, &settings, Port::Disabled, Arc::new(NullSender)).unwrap();
        let handle = link.handle();

        assert!(handle.enqueue(tagged(1)));
        assert!(handle.enqueue(tagged(2)));
        assert_eq!(handle.queue_free(), 0);
        assert!(!handle.enqueue(tagged(3)));
        assert!(matches!(
            handle.try_enqueue(tagged(4)),
            Err(RelayError::QueueFull { link }) if link == LinkId::GROUND
        ));
        assert_eq!(handle.stats().enqueue_dropped, 2);

        assert_eq!(receiver.recv().await, Some(tagged(1)));
        assert_eq!(receiver.recv().await, Some(tagged(2)));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_timeout_gives_up() {
        let settings = LinkSettings::new("test", 1);
        let (link, _receiver) =
            Link::new(LinkId::OUTPUT, &settings, Port::Disabled, Arc::new(NullSender)).unwrap();
        let handle = link.handle();

        assert!(handle.enqueue(tagged(1)));
        assert!(!handle.enqueue_timeout(tagged(2), Duration::from_millis(10)).await);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let settings = LinkSettings::new("test", 0);
        assert!(Link::new(LinkId::GROUND, &settings, Port::Disabled, Arc::new(NullSender)).is_err());
    }

    #[test]
    fn test_reconfigure_bumps_generation_and_reenters() {
        let settings = LinkSettings::new("test", 4);
        let (link, _receiver) =
            Link::new(LinkId::GROUND, &settings, Port::Disabled, Arc::new(NullSender)).unwrap();
        assert_eq!(link.session().generation(), 0);
        assert_eq!(link.peer(), LinkId::OUTPUT);

        // nested locking from the same thread must not deadlock
        link.session().with_locked(|slot| {
            slot.with_locked(|_| link.reconfigure(Port::Disabled, Arc::new(NullSender)));
        });
        assert_eq!(link.session().generation(), 1);
        assert!(link.session().port().is_disabled());
    }
}
