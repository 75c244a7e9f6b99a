use std::fmt;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::codec::{Frame, FrameConfig};
use crate::decoder::{DecodeStats, Diagnostic};
use crate::error::{FrameError, Result};

/// Default number of concurrently allocated channels.
pub const DEFAULT_MAX_CHANNELS: usize = 5;

/// Largest maximum payload size a channel may request by default: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD_CEILING: usize = 16 * 1024 * 1024;

/// Handle to a channel owned by a [`Registry`].
///
/// A handle names one allocation: once the channel is released the handle is
/// stale, even if its slot is later reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    index: usize,
    generation: u32,
}

impl ChannelId {
    /// Id carried by channels created outside a registry. Never valid in a registry.
    pub const STANDALONE: ChannelId = ChannelId {
        index: 0,
        generation: 0,
    };

    /// Slot index within the registry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Allocation count of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

/// Registry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of concurrently allocated channels.
    pub max_channels: usize,
    /// Largest `max_payload_size` a channel may be allocated with.
    pub max_payload_ceiling: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_channels: DEFAULT_MAX_CHANNELS,
            max_payload_ceiling: DEFAULT_MAX_PAYLOAD_CEILING,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    channel: Option<Channel>,
}

/// Bounded pool of independent framing channels, addressed by [`ChannelId`].
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Slot>,
    config: RegistryConfig,
}

impl Registry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        let mut slots = Vec::with_capacity(config.max_channels);
        slots.resize_with(config.max_channels, Slot::default);
        Self { slots, config }
    }

    /// Limits this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Allocate a channel for payloads of at most `max_payload_size` bytes.
    pub fn allocate(&mut self, max_payload_size: usize) -> Result<ChannelId> {
        self.allocate_with_config(FrameConfig::with_max_payload(max_payload_size))
    }

    /// Allocate a channel with explicit framing configuration.
    pub fn allocate_with_config(&mut self, config: FrameConfig) -> Result<ChannelId> {
        let size = config.max_payload_size;
        if size == 0 || size > self.config.max_payload_ceiling {
            return Err(FrameError::InvalidMaxPayload {
                size,
                max: self.config.max_payload_ceiling,
            });
        }
        config.validate()?;

        let Some(index) = self.slots.iter().position(|slot| slot.channel.is_none()) else {
            warn!(max = self.config.max_channels, "no free channel slot");
            return Err(FrameError::CapacityExceeded {
                max: self.config.max_channels,
            });
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1).max(1);
        let id = ChannelId {
            index,
            generation: slot.generation,
        };
        slot.channel = Some(Channel::with_id(id, config));
        debug!(channel = %id, max_payload = size, "allocated channel");
        Ok(id)
    }

    /// Release one channel, dropping its queued input and partial frame.
    pub fn release(&mut self, id: ChannelId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation && slot.channel.is_some())
            .ok_or(FrameError::InvalidChannel(id))?;
        slot.channel = None;
        debug!(channel = %id, "released channel");
        Ok(())
    }

    /// Release every allocated channel. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let released = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.channel.take())
            .count();
        debug!(released, "released all channels");
        released
    }

    /// Check that `id` names a live channel.
    pub fn validate(&self, id: ChannelId) -> Result<()> {
        self.channel(id).map(|_| ())
    }

    /// Borrow a live channel.
    pub fn channel(&self, id: ChannelId) -> Result<&Channel> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.channel.as_ref())
            .ok_or(FrameError::InvalidChannel(id))
    }

    /// Mutably borrow a live channel.
    pub fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.channel.as_mut())
            .ok_or(FrameError::InvalidChannel(id))
    }

    /// Stage raw wire bytes on a channel.
    pub fn feed(&mut self, id: ChannelId, bytes: &[u8]) -> Result<usize> {
        self.channel_mut(id)?.feed(bytes)
    }

    /// Decode at most one frame from a channel's queued bytes.
    ///
    /// `Ok(None)` means the queue ran dry without completing a frame.
    pub fn try_decode(&mut self, id: ChannelId) -> Result<Option<Frame>> {
        Ok(self
            .channel_mut(id)?
            .try_decode()
            .map(|payload| Frame::new(id, payload)))
    }

    /// Encode a payload with a channel's size limits.
    pub fn encode(&mut self, id: ChannelId, payload: &[u8]) -> Result<Bytes> {
        self.channel_mut(id)?.encode(payload)
    }

    /// Decode counters for one channel.
    pub fn stats(&self, id: ChannelId) -> Result<DecodeStats> {
        Ok(self.channel(id)?.stats())
    }

    /// Most recent checksum, overflow or resync event on one channel.
    pub fn last_diagnostic(&self, id: ChannelId) -> Result<Option<Diagnostic>> {
        Ok(self.channel(id)?.last_diagnostic())
    }

    /// Zero one channel's counters and forget its last diagnostic.
    pub fn reset_stats(&mut self, id: ChannelId) -> Result<()> {
        self.channel_mut(id)?.reset_stats();
        Ok(())
    }

    /// True if `id` names a live channel.
    pub fn contains(&self, id: ChannelId) -> bool {
        self.channel(id).is_ok()
    }

    /// Handles of all live channels, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.channel.as_ref().map(Channel::id))
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.channel.is_some()).count()
    }

    /// True when no channel is allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of live channels.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
