//! Async HDLC (RFC 1662) framing for byte streams.
//!
//! ahdlc frames payloads with `0x7E` flags, byte-stuffs reserved values with
//! `0x7D` escapes, and guards each frame with a 16-bit FCS. Decoding is
//! incremental and multi-channel: feed bytes in any fragmentation, poll for
//! complete frames.
//!
//! # Crate Structure
//!
//! - [`frame`]: channel registry, decoder, encoder, FCS and stream adapters
//!
//! The `ahdlc` binary (behind the `cli` feature) encodes and decodes hex byte
//! strings and runs randomized round-trip stress tests.

/// Re-export frame types.
pub mod frame {
    pub use ahdlc_frame::*;
}
