//! Length-prefixed framing used by the harness
//!
//! A frame is `[FRAME_START, len, payload.., FRAME_END]` with `len` the payload
//! length. The whole frame, delimiters included, is what the decoder hands
//! back as a [`Packet`], so a relayed packet can be written out verbatim.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uavrelay_core::{DecodeEvent, FrameDecoder, Packet, TransportError};

pub const FRAME_START: u8 = 0xAA;
pub const FRAME_END: u8 = 0xBB;

/// Largest payload a single length byte can describe
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Wrap `payload` in a frame
pub fn encode_frame(payload: &[u8]) -> Result<Packet, TransportError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(TransportError::Rejected {
            reason: format!("payload of {} bytes does not fit a frame", payload.len()),
        });
    }
    let mut bytes = Vec::with_capacity(payload.len() + 3);
    bytes.push(FRAME_START);
    bytes.push(payload.len() as u8);
    bytes.extend_from_slice(payload);
    bytes.push(FRAME_END);
    Ok(Packet::new(bytes))
}

// ----------------------------------------------------------------------------
// Decoder
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Skipping bytes until a start marker
    Idle,
    Length,
    Payload { remaining: usize },
    End,
}

/// Byte-at-a-time decoder for harness frames
#[derive(Debug)]
pub struct DelimitedDecoder {
    state: State,
    frame: Vec<u8>,
}

impl DelimitedDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            frame: Vec::new(),
        }
    }

    fn restart(&mut self) {
        self.state = State::Idle;
        self.frame.clear();
    }
}

impl Default for DelimitedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for DelimitedDecoder {
    fn feed_byte(&mut self, byte: u8) -> DecodeEvent {
        match self.state {
            State::Idle => {
                if byte == FRAME_START {
                    self.frame.push(byte);
                    self.state = State::Length;
                }
                DecodeEvent::Incomplete
            }
            State::Length => {
                self.frame.push(byte);
                self.state = match byte as usize {
                    0 => State::End,
                    remaining => State::Payload { remaining },
                };
                DecodeEvent::Incomplete
            }
            State::Payload { remaining } => {
                self.frame.push(byte);
                self.state = if remaining == 1 {
                    State::End
                } else {
                    State::Payload {
                        remaining: remaining - 1,
                    }
                };
                DecodeEvent::Incomplete
            }
            State::End => {
                if byte == FRAME_END {
                    self.frame.push(byte);
                    let packet = Packet::new(std::mem::take(&mut self.frame));
                    self.state = State::Idle;
                    DecodeEvent::Complete(packet)
                } else {
                    self.restart();
                    DecodeEvent::Error
                }
            }
        }
    }

    fn reset(&mut self) {
        self.restart();
    }
}

/// Decoder wrapper counting how many bytes it was fed and how often it was reset
pub struct CountingDecoder {
    inner: Box<dyn FrameDecoder>,
    fed: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl CountingDecoder {
    pub fn new(inner: Box<dyn FrameDecoder>) -> Self {
        Self {
            inner,
            fed: Arc::new(AtomicUsize::new(0)),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared byte counter; clone before boxing the decoder
    pub fn fed(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fed)
    }

    pub fn resets(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

impl FrameDecoder for CountingDecoder {
    fn feed_byte(&mut self, byte: u8) -> DecodeEvent {
        self.fed.fetch_add(1, Ordering::Relaxed);
        self.inner.feed_byte(byte)
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut DelimitedDecoder, bytes: &[u8]) -> Vec<DecodeEvent> {
        bytes.iter().map(|b| decoder.feed_byte(*b)).collect()
    }

    #[test]
    fn test_decodes_minimal_frame() {
        let mut decoder = DelimitedDecoder::new();
        let events = feed_all(&mut decoder, &[0xAA, 0x01, 0x00, 0xBB]);
        assert!(events[..3].iter().all(|e| *e == DecodeEvent::Incomplete));
        assert_eq!(
            events[3],
            DecodeEvent::Complete(Packet::new(vec![0xAA, 0x01, 0x00, 0xBB]))
        );
    }

    #[test]
    fn test_skips_noise_and_reports_bad_terminator() {
        let mut decoder = DelimitedDecoder::new();
        let events = feed_all(&mut decoder, &[0x10, 0x20, 0xAA, 0x01, 0x05, 0x00]);
        assert_eq!(events.last(), Some(&DecodeEvent::Error));

        // resynchronised on the next start marker
        let events = feed_all(&mut decoder, &[0xAA, 0x00, 0xBB]);
        assert_eq!(
            events.last(),
            Some(&DecodeEvent::Complete(Packet::new(vec![0xAA, 0x00, 0xBB])))
        );
    }

    #[test]
    fn test_payload_may_contain_markers() {
        let frame = encode_frame(&[FRAME_END, FRAME_START]).unwrap();
        let mut decoder = DelimitedDecoder::new();
        let events = feed_all(&mut decoder, frame.as_bytes());
        assert_eq!(events.last(), Some(&DecodeEvent::Complete(frame)));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        assert!(encode_frame(&[0u8; 256]).is_err());
    }

    #[test]
    fn test_counting_decoder_counts() {
        let mut decoder = CountingDecoder::new(Box::new(DelimitedDecoder::new()));
        let fed = decoder.fed();
        let resets = decoder.resets();
        for byte in [0xAA, 0x00, 0xBB] {
            decoder.feed_byte(byte);
        }
        decoder.reset();
        assert_eq!(fed.load(Ordering::Relaxed), 3);
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }
}
