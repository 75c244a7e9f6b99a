use bytes::{Buf, BytesMut};

use crate::error::{FrameError, Result};

const INITIAL_QUEUE_CAPACITY: usize = 4 * 1024;

/// Ordered, non-blocking staging buffer between bulk feeds and the byte-wise decoder.
///
/// Producers append slices of any size; the decoder drains one byte at a time.
/// Bytes leave in exactly the order they arrived.
#[derive(Debug)]
pub struct ByteQueue {
    buf: BytesMut,
    max_queued: usize,
}

impl ByteQueue {
    /// Create a queue that holds at most `max_queued` undrained bytes.
    pub fn new(max_queued: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_QUEUE_CAPACITY.min(max_queued)),
            max_queued,
        }
    }

    /// Append `bytes`, returning how many were accepted.
    ///
    /// The append is all-or-nothing: a slice that would push the queue past its
    /// bound is rejected whole.
    pub fn push(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Err(FrameError::EmptyInput);
        }
        let queued = self.buf.len().saturating_add(bytes.len());
        if queued > self.max_queued {
            return Err(FrameError::QueueFull {
                queued: self.buf.len(),
                max: self.max_queued,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Take the oldest queued byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.get_u8())
    }

    /// Number of bytes waiting to be drained.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when every fed byte has been drained.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of undrained bytes.
    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    /// Drop every queued byte.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
