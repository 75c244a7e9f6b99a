//! Byte-stuffed async HDLC framing (RFC 1662) with multi-channel decoding.
//!
//! Every frame on the wire is:
//! - A `0x7E` flag sequence
//! - The payload, with `0x7E`/`0x7D` escaped as `0x7D, byte ^ 0x20`
//! - The complemented FCS-16 of the payload, low byte first, escaped the same way
//! - A closing `0x7E` flag sequence
//!
//! Raw bytes can arrive in any fragmentation. A [`Registry`] owns a bounded set
//! of independent [`Channel`]s; each queues fed bytes and decodes at most one
//! frame per call, recovering from corrupt or oversized frames on its own.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod channel;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod fcs;
pub mod queue;
pub mod reader;
pub mod registry;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::HdlcCodec;
pub use channel::Channel;
pub use codec::{
    encode_frame, escaped_len, Frame, FrameConfig, CONTROL_ESCAPE, DEFAULT_MAX_PAYLOAD,
    DEFAULT_MAX_QUEUED, FLAG, FRAMING_OVERHEAD, MAX_PAYLOAD_LIMIT,
};
pub use decoder::{DecodeState, DecodeStats, Diagnostic, FrameDecoder};
pub use error::{FrameError, Result};
pub use queue::ByteQueue;
pub use reader::FrameReader;
pub use registry::{ChannelId, Registry, RegistryConfig, DEFAULT_MAX_CHANNELS};
pub use writer::FrameWriter;
