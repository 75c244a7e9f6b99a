//! Incremental frame decoder.
//!
//! Consumes one wire byte at a time and yields a payload when a closing flag
//! arrives with a good FCS. The last two bytes seen inside a frame are held
//! back in a lookahead window: they are only known to be payload once a third
//! byte follows them, otherwise they were the frame's FCS.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{CONTROL_ESCAPE, ESCAPE_XOR, FLAG};
use crate::fcs::{self, GOOD_FCS, INIT_FCS};

/// Decoder position relative to the frame structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Outside any frame; everything but a flag is discarded.
    SeekingFlag,
    /// Inside a frame, accumulating bytes.
    InFrame,
    /// Inside a frame, directly after a control escape.
    Escaped,
}

/// Recoverable conditions observed while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Empty frame (consecutive flags, escape before flag, or only FCS bytes seen).
    Resync,
    /// The closing flag arrived but the FCS residue was wrong; the frame was dropped.
    ChecksumMismatch { fcs: u16, len: usize },
    /// The frame grew past the decode buffer bound before a closing flag.
    Overflow { limit: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Resync => write!(f, "resync"),
            Diagnostic::ChecksumMismatch { fcs, len } => write!(
                f,
                "checksum mismatch over {len} bytes (fcs {fcs:#06x}, expected {GOOD_FCS:#06x})"
            ),
            Diagnostic::Overflow { limit } => {
                write!(f, "frame exceeded {limit} decoded bytes without end flag")
            }
        }
    }
}

/// Running counters for one decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames emitted with a good FCS.
    pub frames: u64,
    /// Frames dropped for a bad FCS.
    pub checksum_errors: u64,
    /// Frames aborted at the decode buffer bound.
    pub overflows: u64,
    /// Empty frames skipped.
    pub resyncs: u64,
    /// Bytes dropped while seeking a flag.
    pub discarded_bytes: u64,
}

/// Outcome of feeding one byte to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing observable happened.
    Pending,
    /// A complete payload with a good FCS.
    Frame(Bytes),
    /// A recoverable condition; the decoder has already resynchronized.
    Diagnostic(Diagnostic),
}

/// Byte-at-a-time async HDLC frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    fcs: u16,
    held: [u8; 2],
    held_len: usize,
    decoded: BytesMut,
    limit: usize,
    stats: DecodeStats,
    last: Option<Diagnostic>,
}

impl FrameDecoder {
    /// Create a decoder for payloads of at most `max_payload` unescaped bytes.
    ///
    /// The decoded buffer is bounded at `2 × max_payload`.
    pub fn new(max_payload: usize) -> Self {
        let limit = max_payload.saturating_mul(2);
        Self {
            state: DecodeState::SeekingFlag,
            fcs: INIT_FCS,
            held: [0; 2],
            held_len: 0,
            decoded: BytesMut::with_capacity(limit),
            limit,
            stats: DecodeStats::default(),
            last: None,
        }
    }

    /// Feed one wire byte.
    pub fn push(&mut self, byte: u8) -> Step {
        match (self.state, byte) {
            (DecodeState::SeekingFlag, FLAG) => {
                self.reset_frame();
                self.state = DecodeState::InFrame;
                Step::Pending
            }
            (DecodeState::SeekingFlag, _) => {
                self.stats.discarded_bytes += 1;
                Step::Pending
            }
            (DecodeState::InFrame, FLAG) => self.close_frame(),
            (DecodeState::InFrame, CONTROL_ESCAPE) => {
                self.state = DecodeState::Escaped;
                Step::Pending
            }
            (DecodeState::InFrame, _) => self.consume(byte),
            (DecodeState::Escaped, FLAG) => self.resync(),
            (DecodeState::Escaped, _) => {
                self.state = DecodeState::InFrame;
                self.consume(byte ^ ESCAPE_XOR)
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Bytes committed to the current frame (excludes the lookahead window).
    pub fn decoded_len(&self) -> usize {
        self.decoded.len()
    }

    /// Bound on committed bytes per frame.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Counters since creation or the last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Zero the counters and forget the last diagnostic.
    pub fn reset_stats(&mut self) {
        self.stats = DecodeStats::default();
        self.last = None;
    }

    /// Most recent diagnostic, if any.
    pub fn last_diagnostic(&self) -> Option<Diagnostic> {
        self.last
    }

    /// Drop any partial frame and go back to seeking a flag.
    pub fn reset(&mut self) {
        self.reset_frame();
        self.state = DecodeState::SeekingFlag;
    }

    fn reset_frame(&mut self) {
        self.fcs = INIT_FCS;
        self.held_len = 0;
        self.decoded.clear();
        self.decoded.reserve(self.limit);
    }

    fn consume(&mut self, byte: u8) -> Step {
        self.fcs = fcs::update(self.fcs, byte);

        if self.held_len < 2 {
            self.held[self.held_len] = byte;
            self.held_len += 1;
            return Step::Pending;
        }

        if self.decoded.len() >= self.limit {
            self.reset();
            return self.diagnose(Diagnostic::Overflow { limit: self.limit });
        }

        self.decoded.put_u8(self.held[0]);
        self.held = [self.held[1], byte];
        Step::Pending
    }

    fn close_frame(&mut self) -> Step {
        if self.decoded.is_empty() {
            return self.resync();
        }

        if self.fcs != GOOD_FCS {
            let diagnostic = Diagnostic::ChecksumMismatch {
                fcs: self.fcs,
                len: self.decoded.len(),
            };
            self.reset();
            return self.diagnose(diagnostic);
        }

        let payload = self.decoded.split().freeze();
        self.fcs = INIT_FCS;
        self.held_len = 0;
        self.state = DecodeState::SeekingFlag;
        self.stats.frames += 1;
        Step::Frame(payload)
    }

    fn resync(&mut self) -> Step {
        self.reset_frame();
        self.state = DecodeState::InFrame;
        self.diagnose(Diagnostic::Resync)
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) -> Step {
        match diagnostic {
            Diagnostic::Resync => self.stats.resyncs += 1,
            Diagnostic::ChecksumMismatch { .. } => self.stats.checksum_errors += 1,
            Diagnostic::Overflow { .. } => self.stats.overflows += 1,
        }
        self.last = Some(diagnostic);
        Step::Diagnostic(diagnostic)
    }
}
