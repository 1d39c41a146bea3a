#![doc = "uavrelay Harness\n\nDeterministic stand-ins for the router's external collaborators: an\nin-memory byte port, scripted and framed transport sessions, a simple\nlength-prefixed frame decoder, an object store and a scripted input source.\nEverything here is gated behind the `testing` feature."]

#[cfg(feature = "testing")]
pub mod framing;
#[cfg(feature = "testing")]
pub mod input;
#[cfg(feature = "testing")]
pub mod port;
#[cfg(feature = "testing")]
pub mod sender;
#[cfg(feature = "testing")]
pub mod store;

#[cfg(feature = "testing")]
pub use framing::{encode_frame, CountingDecoder, DelimitedDecoder, FRAME_END, FRAME_START};
#[cfg(feature = "testing")]
pub use input::{RecordingDebugSink, ScriptedInput};
#[cfg(feature = "testing")]
pub use port::MemoryPort;
#[cfg(feature = "testing")]
pub use sender::{FramedSender, SentRecord, ScriptedSender, Step};
#[cfg(feature = "testing")]
pub use store::MemoryObjectStore;
