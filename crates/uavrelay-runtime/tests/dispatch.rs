//! Dispatcher tests: retry bounds, counters and event-to-operation mapping
//!
//! Each test drives `EventDispatcher::dispatch` directly on a single link with
//! a scripted session, so attempts and outcomes are fully deterministic.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tokio::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};
use uavrelay_core::{
    AccessMode, Event, InstanceId, LinkId, LinkSettings, ObjectMetadata, ObjectRef, ObjectStore,
    Outcome, Packet, Port, RetryPolicy, Sample, SessionSender, TransportError,
};
use uavrelay_harness::{MemoryObjectStore, MemoryPort, ScriptedSender, SentRecord, Step};
use uavrelay_runtime::{EventDispatcher, Link};

const OBJECT: ObjectRef = ObjectRef::new(0xCAFE_0001);

fn policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(250))
}

fn enabled_link(sender: Arc<ScriptedSender>) -> Link {
    enabled_link_with(sender)
}

fn enabled_link_with(sender: Arc<dyn SessionSender>) -> Link {
    let port = Port::enabled(MemoryPort::new("test"));
    let (link, _receiver) =
        Link::new(LinkId::GROUND, &LinkSettings::new("test", 4), port, sender).unwrap();
    link
}

fn changed(ack_required: bool) -> Event {
    Event::ObjectChanged {
        object: OBJECT,
        instance: InstanceId::FIRST,
        ack_required,
    }
}

#[tokio::test]
async fn test_first_attempt_success() {
    let sender = Arc::new(ScriptedSender::new());
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher.dispatch(&link, changed(true)).await;

    assert_eq!(outcome, Outcome::Sent);
    assert_eq!(sender.calls(), 1);
    let stats = link.stats().snapshot();
    assert_eq!(stats.retries, 0);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.sent, 1);
    assert_eq!(
        sender.delivered(),
        vec![SentRecord::Announce {
            object: OBJECT,
            instance: InstanceId::FIRST,
            ack_required: true,
        }]
    );
}

#[tokio::test]
async fn test_succeeds_on_last_attempt() {
    let sender = Arc::new(ScriptedSender::failing(2));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher.dispatch(&link, changed(false)).await;

    assert_eq!(outcome, Outcome::SentAfterRetries(2));
    assert_eq!(sender.calls(), 3);
    assert_eq!(link.stats().retries(), 2);
    assert_eq!(link.stats().errors(), 0);
}

#[tokio::test]
async fn test_exhausted_attempts_drop_the_event() {
    let sender = Arc::new(ScriptedSender::always(Step::Fail));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher.dispatch(&link, changed(false)).await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_eq!(sender.calls(), 3);
    assert_eq!(link.stats().retries(), 2);
    assert_eq!(link.stats().errors(), 1);
    assert!(sender.delivered().is_empty());
}

#[tokio::test]
async fn test_zero_retries_means_one_attempt() {
    let sender = Arc::new(ScriptedSender::always(Step::Fail));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(RetryPolicy::new(0, Duration::from_millis(250)));

    assert_eq!(dispatcher.dispatch(&link, changed(false)).await, Outcome::Dropped);
    assert_eq!(sender.calls(), 1);
    assert_eq!(link.stats().retries(), 0);
    assert_eq!(link.stats().errors(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_attempts_are_bounded_by_timeout() {
    let sender = Arc::new(ScriptedSender::always(Step::Stall));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let started = Instant::now();
    let outcome = dispatcher.dispatch(&link, changed(true)).await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_eq!(sender.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(750));
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(link.stats().errors(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stall_then_success_counts_retry() {
    let sender = Arc::new(ScriptedSender::new().with_script([Step::Stall]));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher.dispatch(&link, changed(true)).await;

    assert_eq!(outcome, Outcome::SentAfterRetries(1));
    assert_eq!(link.stats().retries(), 1);
}

#[tokio::test]
async fn test_disabled_port_fails_fast() {
    let sender = Arc::new(ScriptedSender::new());
    let (link, _receiver) = Link::new(
        LinkId::OUTPUT,
        &LinkSettings::new("off", 4),
        Port::Disabled,
        sender.clone(),
    )
    .unwrap();
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher
        .dispatch(&link, Event::ForwardRequest(Packet::new(vec![0xAA, 0x00, 0xBB])))
        .await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_eq!(sender.calls(), 0);
    assert_eq!(link.stats().errors(), 1);
    assert_eq!(link.stats().retries(), 0);
}

#[tokio::test]
async fn test_session_port_errors_are_retried_like_any_failure() {
    let sender = Arc::new(ScriptedSender::always(Step::Disabled));
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher
        .dispatch(
            &link,
            Event::UpdateRequest {
                object: OBJECT,
                instance: InstanceId::FIRST,
            },
        )
        .await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_eq!(sender.calls(), 3);
    assert_eq!(link.stats().retries(), 2);
    assert_eq!(link.stats().errors(), 1);
}

/// Fails its first attempt after switching the link over to a disabled port
struct DisablingSender {
    link: OnceLock<Weak<Link>>,
    replacement: Arc<ScriptedSender>,
    calls: AtomicUsize,
}

#[async_trait]
impl SessionSender for DisablingSender {
    async fn encode_and_send(
        &self,
        _object: ObjectRef,
        _instance: InstanceId,
        _ack_required: bool,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(link) = self.link.get().and_then(Weak::upgrade) {
            link.reconfigure(Port::Disabled, self.replacement.clone());
        }
        Err(TransportError::Timeout { duration_ms: 250 })
    }

    async fn encode_request_and_send(
        &self,
        _object: ObjectRef,
        _instance: InstanceId,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        Err(TransportError::PortDisabled)
    }

    async fn send_raw(&self, _packet: &Packet) -> Result<(), TransportError> {
        Err(TransportError::PortDisabled)
    }
}

#[tokio::test]
async fn test_port_disabled_between_attempts_stops_retrying() {
    let replacement = Arc::new(ScriptedSender::new());
    let sender = Arc::new(DisablingSender {
        link: OnceLock::new(),
        replacement: replacement.clone(),
        calls: AtomicUsize::new(0),
    });
    let link = Arc::new(enabled_link_with(sender.clone()));
    assert_ok!(sender.link.set(Arc::downgrade(&link)));
    let dispatcher = EventDispatcher::new(policy());

    let outcome = dispatcher.dispatch(&link, changed(true)).await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    assert_eq!(replacement.calls(), 0);
    assert_eq!(link.stats().retries(), 0);
    assert_eq!(link.stats().errors(), 1);
    assert!(link.session().port().is_disabled());
}

#[tokio::test]
async fn test_request_and_forward_mapping() {
    let sender = Arc::new(ScriptedSender::new());
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy());
    let packet = Packet::new(vec![0xAA, 0x01, 0x00, 0xBB]);

    dispatcher
        .dispatch(
            &link,
            Event::UpdateRequest {
                object: OBJECT,
                instance: InstanceId::new(3),
            },
        )
        .await;
    dispatcher
        .dispatch(&link, Event::ForwardRequest(packet.clone()))
        .await;

    assert_eq!(
        sender.delivered(),
        vec![
            SentRecord::Request {
                object: OBJECT,
                instance: InstanceId::new(3),
            },
            SentRecord::Raw(packet),
        ]
    );
}

#[tokio::test]
async fn test_poll_tick_commits_sample_and_announces() {
    let store = Arc::new(MemoryObjectStore::new());
    store.register(
        OBJECT,
        ObjectMetadata {
            ack_required: true,
            access: AccessMode::ReadOnly,
        },
    );
    let sender = Arc::new(ScriptedSender::new());
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy()).with_store(store.clone());
    let sample = Sample::new(&[1000, 1500, 2000]);

    let outcome = dispatcher
        .dispatch(
            &link,
            Event::PollTick {
                object: OBJECT,
                sample: sample.clone(),
            },
        )
        .await;

    assert_eq!(outcome, Outcome::Sent);
    let metadata = assert_ok!(store.get_metadata(OBJECT));
    assert_eq!(metadata.access, AccessMode::ReadWrite);
    let stored = assert_ok!(store.get(OBJECT, InstanceId::FIRST));
    assert_eq!(Sample::from_value(&stored).unwrap(), sample);
    assert_eq!(
        sender.delivered(),
        vec![SentRecord::Announce {
            object: OBJECT,
            instance: InstanceId::FIRST,
            ack_required: true,
        }]
    );
}

#[tokio::test]
async fn test_poll_tick_for_unknown_object_is_dropped() {
    let store = Arc::new(MemoryObjectStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let link = enabled_link(sender.clone());
    let dispatcher = EventDispatcher::new(policy()).with_store(store.clone());

    let outcome = dispatcher
        .dispatch(
            &link,
            Event::PollTick {
                object: OBJECT,
                sample: Sample::new(&[1]),
            },
        )
        .await;

    assert_eq!(outcome, Outcome::Dropped);
    assert_err!(store.get_metadata(OBJECT));
    assert_eq!(sender.calls(), 0);
    assert_eq!(link.stats().errors(), 1);
}
