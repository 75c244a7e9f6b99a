//! A single framing context: input queue, decoder state and encode buffer.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{encode_frame, FrameConfig};
use crate::decoder::{DecodeState, DecodeStats, Diagnostic, FrameDecoder, Step};
use crate::error::Result;
use crate::queue::ByteQueue;
use crate::registry::ChannelId;

/// Independent framing context.
///
/// A channel is not reentrant: callers driving one channel from several threads
/// must serialize access themselves (e.g. a `Mutex<Channel>`). Distinct channels
/// share nothing and can be driven in parallel.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    config: FrameConfig,
    queue: ByteQueue,
    decoder: FrameDecoder,
    outbound: BytesMut,
}

impl Channel {
    /// Create a channel outside any registry.
    ///
    /// Fails when `config` has a zero payload size or a zero queue bound.
    pub fn new(config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_id(ChannelId::STANDALONE, config))
    }

    pub(crate) fn with_id(id: ChannelId, config: FrameConfig) -> Self {
        Self {
            id,
            config,
            queue: ByteQueue::new(config.max_queued_bytes),
            decoder: FrameDecoder::new(config.max_payload_size),
            outbound: BytesMut::with_capacity(config.encode_capacity()),
        }
    }

    /// Registry handle, or [`ChannelId::STANDALONE`].
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Framing limits this channel was created with.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Configured maximum unescaped payload size.
    pub fn max_payload_size(&self) -> usize {
        self.config.max_payload_size
    }

    /// Stage raw wire bytes for decoding. Never blocks.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<usize> {
        self.queue.push(bytes)
    }

    /// Drain queued bytes until one frame completes or the queue runs dry.
    ///
    /// Bytes after a completed frame stay queued for the next call. Checksum
    /// failures and overflows are absorbed here and surface through
    /// [`last_diagnostic`](Self::last_diagnostic) and [`stats`](Self::stats).
    pub fn try_decode(&mut self) -> Option<Bytes> {
        while let Some(byte) = self.queue.pop() {
            match self.decoder.push(byte) {
                Step::Pending => {}
                Step::Frame(payload) => {
                    trace!(channel = %self.id, len = payload.len(), "frame decoded");
                    return Some(payload);
                }
                Step::Diagnostic(diagnostic) => self.report(diagnostic),
            }
        }
        None
    }

    /// Encode `payload` into a complete frame.
    pub fn encode(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.outbound.clear();
        if let Err(err) = encode_frame(payload, self.config.max_payload_size, &mut self.outbound)
        {
            debug!(channel = %self.id, len = payload.len(), error = %err, "encode rejected");
            return Err(err);
        }
        Ok(self.outbound.split().freeze())
    }

    /// Bytes fed but not yet consumed by the decoder.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Decoder state after the last consumed byte.
    pub fn state(&self) -> DecodeState {
        self.decoder.state()
    }

    /// Decode counters since creation or the last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> DecodeStats {
        self.decoder.stats()
    }

    /// Most recent checksum, overflow or resync event.
    pub fn last_diagnostic(&self) -> Option<Diagnostic> {
        self.decoder.last_diagnostic()
    }

    /// Zero the counters and forget the last diagnostic.
    pub fn reset_stats(&mut self) {
        self.decoder.reset_stats();
    }

    /// Drop queued input and any partial frame.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.decoder.reset();
    }

    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::Resync => trace!(channel = %self.id, "resync on empty frame"),
            Diagnostic::ChecksumMismatch { fcs, len } => warn!(
                channel = %self.id,
                len,
                fcs,
                "frame dropped: {diagnostic}"
            ),
            Diagnostic::Overflow { limit } => warn!(
                channel = %self.id,
                limit,
                "frame dropped: {diagnostic}"
            ),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::with_id(ChannelId::STANDALONE, FrameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FrameConfig, FLAG};
    use crate::error::FrameError;

    fn channel(max_payload: usize) -> Channel {
        Channel::new(FrameConfig::with_max_payload(max_payload)).unwrap()
    }

    #[test]
    fn encode_then_decode() {
        let mut ch = channel(64);
        let wire = ch.encode(b"round trip").unwrap();
        assert_eq!(ch.feed(&wire).unwrap(), wire.len());
        assert_eq!(ch.try_decode().unwrap().as_ref(), b"round trip");
        assert_eq!(ch.queued(), 0);
    }

    #[test]
    fn one_frame_per_call_and_rest_stays_queued() {
        let mut ch = channel(64);
        let first = ch.encode(b"first").unwrap();
        let second = ch.encode(b"second").unwrap();
        ch.feed(&first).unwrap();
        ch.feed(&second).unwrap();

        assert_eq!(ch.try_decode().unwrap().as_ref(), b"first");
        assert_eq!(ch.queued(), second.len());
        assert_eq!(ch.try_decode().unwrap().as_ref(), b"second");
        assert!(ch.try_decode().is_none());
    }

    #[test]
    fn split_delivery() {
        let mut ch = channel(64);
        let wire = ch.encode(&[0x7E, 1, 2, 0x7D, 3]).unwrap();
        let (head, tail) = wire.split_at(wire.len() / 2);

        ch.feed(head).unwrap();
        assert!(ch.try_decode().is_none());
        ch.feed(tail).unwrap();
        assert_eq!(ch.try_decode().unwrap().as_ref(), &[0x7E, 1, 2, 0x7D, 3]);
    }

    #[test]
    fn empty_feed_is_rejected() {
        let mut ch = channel(8);
        assert!(matches!(ch.feed(&[]), Err(FrameError::EmptyInput)));
    }

    #[test]
    fn checksum_failure_is_recorded_not_returned() {
        let mut ch = channel(64);
        let mut wire = ch.encode(b"abcdef").unwrap().to_vec();
        wire[4] ^= 0x02;
        ch.feed(&wire).unwrap();
        assert!(ch.try_decode().is_none());
        assert!(matches!(
            ch.last_diagnostic(),
            Some(Diagnostic::ChecksumMismatch { .. })
        ));
        assert_eq!(ch.stats().checksum_errors, 1);
    }

    #[test]
    fn encode_reports_frame_too_large() {
        let mut ch = channel(4);
        let err = ch.encode(&[0u8; 9]).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 9, max: 8 }));
    }

    #[test]
    fn reset_drops_queue_and_partial_frame() {
        let mut ch = channel(16);
        ch.feed(&[FLAG, 1, 2, 3]).unwrap();
        assert!(ch.try_decode().is_none());
        ch.feed(&[4, 5]).unwrap();
        ch.reset();
        assert_eq!(ch.queued(), 0);
        assert_eq!(ch.state(), DecodeState::SeekingFlag);
    }

    #[test]
    fn new_rejects_unusable_config() {
        assert!(matches!(
            Channel::new(FrameConfig::with_max_payload(0)),
            Err(FrameError::InvalidMaxPayload { size: 0, .. })
        ));
        let no_queue = FrameConfig {
            max_payload_size: 64,
            max_queued_bytes: 0,
        };
        assert!(matches!(
            Channel::new(no_queue),
            Err(FrameError::InvalidQueueBound { size: 0 })
        ));
    }

    #[test]
    fn default_channel_uses_default_config() {
        let ch = Channel::default();
        assert_eq!(*ch.config(), FrameConfig::default());
        assert_eq!(ch.id(), ChannelId::STANDALONE);
    }

    #[test]
    fn standalone_channel_id() {
        assert_eq!(channel(1).id(), ChannelId::STANDALONE);
    }
}
