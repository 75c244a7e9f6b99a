use crate::registry::ChannelId;

/// Errors that can occur during frame encoding/decoding and channel management.
///
/// Checksum mismatches, decode overflows and resynchronizations are not errors:
/// the decoder recovers from them internally and records a
/// [`Diagnostic`](crate::Diagnostic) on the channel instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Every channel slot in the registry is in use.
    #[error("no free channel (max {max} concurrent channels)")]
    CapacityExceeded { max: usize },

    /// The handle does not name a currently allocated channel.
    #[error("invalid or released channel {0}")]
    InvalidChannel(ChannelId),

    /// A feed call supplied no bytes.
    #[error("empty input")]
    EmptyInput,

    /// The escaped frame would not fit the channel's encode buffer.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The requested maximum payload size is zero or above the configured ceiling.
    #[error("invalid max payload size {size} (must be 1..={max})")]
    InvalidMaxPayload { size: usize, max: usize },

    /// A channel was configured to queue no input at all.
    #[error("invalid max queued bytes {size} (must be at least 1)")]
    InvalidQueueBound { size: usize },

    /// Accepting the input would exceed the channel's queued-byte bound.
    #[error("input queue full ({queued} bytes queued, max {max})")]
    QueueFull { queued: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
