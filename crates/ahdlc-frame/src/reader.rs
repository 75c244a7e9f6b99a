use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::channel::Channel;
use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream (serial port, pipe, file).
///
/// Handles partial reads and noise between frames internally; callers always
/// get complete, FCS-checked payloads.
pub struct FrameReader<T> {
    inner: T,
    channel: Channel,
    chunk: Box<[u8]>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::from_channel(inner, Channel::default())
    }

    /// Create a new frame reader with explicit configuration.
    ///
    /// Fails when `config` has a zero payload size or a zero queue bound.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        Ok(Self::from_channel(inner, Channel::new(config)?))
    }

    fn from_channel(inner: T, channel: Channel) -> Self {
        // Never read more than the channel can queue in one feed.
        let chunk_size = READ_CHUNK_SIZE.min(channel.config().max_queued_bytes);
        Self {
            inner,
            channel,
            chunk: vec![0u8; chunk_size].into_boxed_slice(),
        }
    }

    /// Read the next complete payload (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(payload) = self.channel.try_decode() {
                return Ok(payload);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.channel.feed(&self.chunk[..read])?;
        }
    }

    /// Borrow the framing channel (stats, diagnostics).
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
