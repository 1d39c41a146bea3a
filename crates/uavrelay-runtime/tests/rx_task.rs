//! Receiver task tests driven one read at a time
//!
//! Each test builds the two links by hand and calls `RxTask::poll_once`
//! directly, so the peer queue is never drained behind the test's back.

use std::sync::Arc;
use uavrelay_core::{Event, LinkId, LinkSettings, Packet, Port, RxConfig};
use uavrelay_harness::{DelimitedDecoder, MemoryPort, ScriptedSender};
use uavrelay_runtime::{EventReceiver, Link, RxTask};

fn link(id: LinkId, capacity: usize, port: Port) -> (Arc<Link>, EventReceiver) {
    let (link, receiver) = Link::new(
        id,
        &LinkSettings::new(id.to_string(), capacity),
        port,
        Arc::new(ScriptedSender::new()),
    )
    .unwrap();
    (Arc::new(link), receiver)
}

fn config() -> RxConfig {
    RxConfig {
        read_timeout_ms: 10,
        idle_interval_ms: 5,
        read_chunk: 64,
    }
}

#[tokio::test]
async fn test_full_peer_queue_drops_relayed_packets() {
    let port = MemoryPort::new("gcs");
    let (ground, _ground_rx) = link(LinkId::GROUND, 4, Port::enabled(port.clone()));
    let (output, mut output_rx) = link(LinkId::OUTPUT, 1, Port::Disabled);
    let mut rx = RxTask::new(
        ground.clone(),
        output.handle(),
        Box::new(DelimitedDecoder::new()),
        config(),
    );

    port.inject(&[0xAA, 0x00, 0xBB, 0xAA, 0x00, 0xBB]);
    let mut buf = vec![0u8; 64];
    rx.poll_once(&mut buf).await;

    let stats = ground.stats().snapshot();
    assert_eq!(stats.forwarded, 1);
    assert_eq!(stats.forward_dropped, 1);
    assert_eq!(output.handle().queue_free(), 0);
    assert_eq!(
        output_rx.try_recv().unwrap(),
        Event::ForwardRequest(Packet::new(vec![0xAA, 0x00, 0xBB]))
    );
    assert!(output_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_read_failures_are_tracked_until_the_port_recovers() {
    let dead = MemoryPort::new("dead");
    dead.close();
    let (ground, _ground_rx) = link(LinkId::GROUND, 4, Port::enabled(dead));
    let (output, _output_rx) = link(LinkId::OUTPUT, 4, Port::Disabled);
    let mut rx = RxTask::new(
        ground.clone(),
        output.handle(),
        Box::new(DelimitedDecoder::new()),
        config(),
    );
    let mut buf = vec![0u8; 64];

    assert!(!rx.read_failing());
    for _ in 0..3 {
        rx.poll_once(&mut buf).await;
        assert!(rx.read_failing());
    }

    ground.reconfigure(
        Port::enabled(MemoryPort::new("fresh")),
        Arc::new(ScriptedSender::new()),
    );
    rx.poll_once(&mut buf).await;
    assert!(!rx.read_failing());
}
