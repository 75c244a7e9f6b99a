//! `tokio_util::codec` adapter for use with `FramedRead` / `FramedWrite`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::channel::Channel;
use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Async HDLC codec backed by a standalone [`Channel`].
#[derive(Debug)]
pub struct HdlcCodec {
    channel: Channel,
}

impl HdlcCodec {
    /// Codec with the default payload size and queue bound.
    pub fn new() -> Self {
        Self {
            channel: Channel::default(),
        }
    }

    /// Codec with explicit framing limits.
    ///
    /// Fails when `config` has a zero payload size or a zero queue bound.
    pub fn with_config(config: FrameConfig) -> Result<Self> {
        Ok(Self {
            channel: Channel::new(config)?,
        })
    }

    /// Borrow the framing channel (stats, diagnostics).
    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

impl Default for HdlcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HdlcCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        loop {
            if let Some(payload) = self.channel.try_decode() {
                return Ok(Some(payload));
            }
            if src.is_empty() {
                return Ok(None);
            }
            let room = self
                .channel
                .config()
                .max_queued_bytes
                .saturating_sub(self.channel.queued());
            let chunk = src.split_to(src.len().min(room));
            self.channel.feed(&chunk)?;
        }
    }
}

impl Encoder<&[u8]> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(item, self.channel.max_payload_size(), dst)?;
        Ok(())
    }
}

impl Encoder<Bytes> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, self.channel.max_payload_size(), dst)?;
        Ok(())
    }
}
