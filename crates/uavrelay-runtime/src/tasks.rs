//! Per-link sender and receiver tasks
//!
//! Each link runs exactly two tasks:
//!
//! - `TxTask`: sole consumer of the link's queue; dispatches one event at a
//!   time, in FIFO order
//! - `RxTask`: reads the link's port, feeds the decoder one byte at a time and
//!   relays every complete packet to the peer link's queue

use std::sync::Arc;
use tokio::time;
use uavrelay_core::{
    DecodeEvent, Event, FrameDecoder, Outcome, Packet, PortError, RelayResult, RxConfig,
};

use crate::link::{EventReceiver, Link, LinkHandle};
use crate::logic::EventDispatcher;

use tracing::{debug, info, trace, warn};

// ----------------------------------------------------------------------------
// Sender Task
// ----------------------------------------------------------------------------

/// Drains one link's queue through the dispatcher
pub struct TxTask {
    link: Arc<Link>,
    receiver: EventReceiver,
    dispatcher: Arc<EventDispatcher>,
}

impl TxTask {
    pub fn new(link: Arc<Link>, receiver: EventReceiver, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            link,
            receiver,
            dispatcher,
        }
    }

    /// Wait for an event, dispatch it, repeat.
    ///
    /// Only returns once every producer handle (including the link's own) is gone.
    pub async fn run(&mut self) -> RelayResult<()> {
        info!(link = %self.link.id(), name = self.link.name(), "tx task starting");

        while let Some(event) = self.receiver.recv().await {
            self.process(event).await;
        }

        debug!(link = %self.link.id(), "event queue closed, tx task stopping");
        Ok(())
    }

    /// Dispatch a single event
    pub async fn process(&self, event: Event) -> Outcome {
        let outcome = self.dispatcher.dispatch(&self.link, event).await;
        if let Outcome::SentAfterRetries(retries) = outcome {
            trace!(link = %self.link.id(), retries, "sent after retries");
        }
        outcome
    }
}

// ----------------------------------------------------------------------------
// Receiver Task
// ----------------------------------------------------------------------------

/// Decodes one link's inbound byte stream and relays packets to the peer
pub struct RxTask {
    link: Arc<Link>,
    peer: LinkHandle,
    decoder: Box<dyn FrameDecoder>,
    config: RxConfig,
    generation: u64,
    read_failing: bool,
}

impl RxTask {
    pub fn new(
        link: Arc<Link>,
        peer: LinkHandle,
        decoder: Box<dyn FrameDecoder>,
        config: RxConfig,
    ) -> Self {
        let generation = link.session().generation();
        Self {
            link,
            peer,
            decoder,
            config,
            generation,
            read_failing: false,
        }
    }

    /// Whether the last read of an enabled port failed
    pub fn read_failing(&self) -> bool {
        self.read_failing
    }

    pub async fn run(&mut self) -> RelayResult<()> {
        info!(
            link = %self.link.id(),
            peer = %self.peer.id(),
            "rx task starting"
        );

        let mut buf = vec![0u8; self.config.read_chunk.max(1)];
        loop {
            self.poll_once(&mut buf).await;
        }
    }

    /// One read (or idle sleep) of the receive loop
    pub async fn poll_once(&mut self, buf: &mut [u8]) {
        let generation = self.link.session().generation();
        if generation != self.generation {
            debug!(link = %self.link.id(), "session reconfigured, resetting decoder");
            self.decoder.reset();
            self.generation = generation;
        }

        let port = self.link.session().port();
        let Some(port) = port.get() else {
            time::sleep(self.config.idle_interval()).await;
            return;
        };

        match port.read(buf, self.config.read_timeout()).await {
            Ok(count) => {
                if self.read_failing {
                    info!(link = %self.link.id(), port = port.name(), "port readable again");
                    self.read_failing = false;
                }
                for &byte in &buf[..count] {
                    self.process_byte(byte);
                }
            }
            Err(PortError::Disabled) => {
                time::sleep(self.config.idle_interval()).await;
            }
            Err(e) => {
                // Only the first of a run of failures is worth a warning
                if self.read_failing {
                    debug!(link = %self.link.id(), port = port.name(), "read failed: {}", e);
                } else {
                    warn!(link = %self.link.id(), port = port.name(), "read failed: {}", e);
                    self.read_failing = true;
                }
                time::sleep(self.config.idle_interval()).await;
            }
        }
    }

    /// Feed one byte to the decoder (exactly once) and act on the result
    pub fn process_byte(&mut self, byte: u8) {
        match self.decoder.feed_byte(byte) {
            DecodeEvent::Incomplete => {}
            DecodeEvent::Complete(packet) => self.forward(packet),
            DecodeEvent::Error => {
                trace!(link = %self.link.id(), "frame discarded by decoder");
                self.link.stats().record_decode_error();
            }
        }
    }

    fn forward(&self, packet: Packet) {
        trace!(link = %self.link.id(), peer = %self.peer.id(), ?packet, "relaying packet");
        if self.peer.enqueue(Event::ForwardRequest(packet)) {
            self.link.stats().record_forwarded();
        } else {
            debug!(link = %self.link.id(), peer = %self.peer.id(), "peer queue full, packet dropped");
            self.link.stats().record_forward_dropped();
        }
    }
}
