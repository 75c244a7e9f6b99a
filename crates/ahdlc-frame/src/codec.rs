use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::fcs::{self, INIT_FCS};
use crate::registry::ChannelId;

/// Flag sequence delimiting every frame.
pub const FLAG: u8 = 0x7E;

/// Control escape: the following byte was XORed with [`ESCAPE_XOR`].
pub const CONTROL_ESCAPE: u8 = 0x7D;

/// Transform applied to an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Framing bytes added around the escaped payload in the worst case:
/// two flags plus a fully escaped two-byte FCS.
pub const FRAMING_OVERHEAD: usize = 6;

/// Default maximum unescaped payload size.
pub const DEFAULT_MAX_PAYLOAD: usize = 1027;

/// Default bound on bytes fed to a channel but not yet decoded.
pub const DEFAULT_MAX_QUEUED: usize = 64 * 1024;

/// Largest `S` whose `2 × S + FRAMING_OVERHEAD` encode bound is representable.
pub const MAX_PAYLOAD_LIMIT: usize = (usize::MAX - FRAMING_OVERHEAD) / 2;

/// A decoded payload and the channel it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The channel this payload was decoded on.
    pub channel: ChannelId,
    /// The unescaped payload, FCS removed.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: ChannelId, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

/// Per-channel framing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum unescaped payload size `S`. Decode and encode buffers are sized `2 × S`.
    pub max_payload_size: usize,
    /// Maximum bytes staged by `feed` and not yet drained by `try_decode`.
    pub max_queued_bytes: usize,
}

impl FrameConfig {
    /// Default configuration with an explicit maximum payload size.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            max_payload_size,
            ..Self::default()
        }
    }

    /// Upper bound on decoded bytes held for one frame.
    pub fn decode_capacity(&self) -> usize {
        self.max_payload_size.saturating_mul(2)
    }

    /// Upper bound on one encoded frame on the wire.
    pub fn encode_capacity(&self) -> usize {
        self.decode_capacity().saturating_add(FRAMING_OVERHEAD)
    }

    /// Reject configurations a channel cannot operate with: a zero payload
    /// size, or a queue that can never hold a byte.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_size == 0 || self.max_payload_size > MAX_PAYLOAD_LIMIT {
            return Err(FrameError::InvalidMaxPayload {
                size: self.max_payload_size,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        if self.max_queued_bytes == 0 {
            return Err(FrameError::InvalidQueueBound {
                size: self.max_queued_bytes,
            });
        }
        Ok(())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_queued_bytes: DEFAULT_MAX_QUEUED,
        }
    }
}

/// True for the two byte values that must never appear bare inside a frame.
#[inline]
pub fn needs_escape(byte: u8) -> bool {
    byte == FLAG || byte == CONTROL_ESCAPE
}

/// Length of `data` once byte-stuffed.
pub fn escaped_len(data: &[u8]) -> usize {
    data.len() + data.iter().filter(|&&b| needs_escape(b)).count()
}

fn put_escaped(dst: &mut BytesMut, byte: u8) {
    if needs_escape(byte) {
        dst.put_u8(CONTROL_ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Encode a payload into a complete, self-delimiting frame.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────┬─────────────────────┬──────┐
/// │ 0x7E │ payload (escaped)    │ FCS lo, hi (escaped) │ 0x7E │
/// └──────┴──────────────────────┴─────────────────────┴──────┘
/// ```
///
/// The FCS covers the raw payload and is sent complemented, low byte first.
/// Fails with [`FrameError::FrameTooLarge`] when the opening flag plus the escaped
/// payload would exceed `2 × max_payload + 1` bytes; `dst` is untouched in that case.
/// Returns the number of bytes appended to `dst`.
pub fn encode_frame(payload: &[u8], max_payload: usize, dst: &mut BytesMut) -> Result<usize> {
    let max = max_payload.saturating_mul(2);
    let escaped = escaped_len(payload);
    if escaped > max {
        return Err(FrameError::FrameTooLarge {
            size: escaped,
            max,
        });
    }

    let start = dst.len();
    dst.reserve(escaped + FRAMING_OVERHEAD);
    dst.put_u8(FLAG);

    let mut fcs = INIT_FCS;
    for &byte in payload {
        fcs = fcs::update(fcs, byte);
        put_escaped(dst, byte);
    }

    for byte in (fcs ^ 0xFFFF).to_le_bytes() {
        put_escaped(dst, byte);
    }
    dst.put_u8(FLAG);

    Ok(dst.len() - start)
}
