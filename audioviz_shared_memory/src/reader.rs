//! Consumer side of the frame ring with drop detection

use crate::error::{ShmError, ShmResult};
use crate::segment::{ChannelNames, SegmentHandle};
use crate::stats::ReaderStats;
use std::time::{Duration, Instant};
use viz::consts::{BUFFER_SLOTS, SLOT_SIZE, slot_for_sequence};
use viz::frame::Frame;

/// Single consumer reading frames in producer order.
///
/// The reader expects `last_sequence + 1` in slot `(last_sequence + 1) % 8`.
/// When that slot already holds a newer frame the producer has lapped the
/// reader; it then resumes at the oldest frame still in the ring and counts
/// everything before it as dropped.
///
/// A producer restarted on the same channel begins again at sequence 1. The
/// reader recognizes its frames by a timestamp newer than the last frame read
/// and follows the new sequence from there.
///
/// Only one reader per channel is supported. Two readers waiting on the same
/// semaphore steal counts from each other.
pub struct FrameReader {
    channel: Option<SegmentHandle>,
    last_sequence: u64,
    last_timestamp_us: u64,
    frames_read: u64,
    frames_dropped: u64,
    frame: Box<Frame>,
    slot_bytes: Box<[u8; SLOT_SIZE]>,
}

impl FrameReader {
    /// Open the channel whose segment is `name`, using the protocol semaphore.
    pub fn init(name: &str, create: bool) -> ShmResult<Self> {
        Self::init_with(&ChannelNames::for_segment(name), create)
    }

    /// Open the channel named by `names`.
    pub fn init_with(names: &ChannelNames, create: bool) -> ShmResult<Self> {
        let channel = SegmentHandle::create_or_attach(names, create)?;
        Ok(Self {
            channel: Some(channel),
            last_sequence: 0,
            last_timestamp_us: 0,
            frames_read: 0,
            frames_dropped: 0,
            frame: Box::new(Frame::zeroed()),
            slot_bytes: Box::new([0u8; SLOT_SIZE]),
        })
    }

    /// Wait up to `timeout_ms` for the next frame (0 waits indefinitely).
    ///
    /// Returns `Ok(None)` on timeout. A slot with a bad magic number is
    /// reported as [`ShmError::ProtocolViolation`] and leaves every counter
    /// untouched. A wake-up whose slot holds a frame older than expected
    /// belongs to a frame already counted as dropped and is skipped, unless
    /// the ring holds frames from a restarted producer.
    pub fn read_frame(&mut self, timeout_ms: u32) -> ShmResult<Option<&Frame>> {
        let channel = self.channel.as_ref().ok_or(ShmError::Closed)?;
        let deadline =
            (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(u64::from(timeout_ms)));

        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(None);
                    }
                    Some(left)
                }
                None => None,
            };

            if !channel.semaphore().wait(remaining)? {
                return Ok(None);
            }

            let expected = self.last_sequence + 1;
            let mut slot = slot_for_sequence(expected);
            channel.read_slot(slot, &mut self.slot_bytes);
            *self.frame = Frame::decode(&self.slot_bytes);

            if let Err(violation) = self.frame.header.check_magic() {
                tracing::warn!("Slot {} rejected: {}", slot, violation);
                return Err(violation.into());
            }

            if self.frame.header.frame_sequence() > expected {
                if let Some(oldest) = oldest_unread_slot(channel, self.last_sequence) {
                    if oldest != slot {
                        slot = oldest;
                        channel.read_slot(slot, &mut self.slot_bytes);
                        *self.frame = Frame::decode(&self.slot_bytes);
                        if let Err(violation) = self.frame.header.check_magic() {
                            tracing::warn!("Slot {} rejected during resync: {}", slot, violation);
                            return Err(violation.into());
                        }
                    }
                }
            }

            let sequence = self.frame.header.frame_sequence();
            if sequence < expected {
                if let Some(restart) =
                    restarted_slot(channel, self.last_sequence, self.last_timestamp_us)
                {
                    slot = restart;
                    channel.read_slot(slot, &mut self.slot_bytes);
                    *self.frame = Frame::decode(&self.slot_bytes);
                    if let Err(violation) = self.frame.header.check_magic() {
                        tracing::warn!("Slot {} rejected after restart: {}", slot, violation);
                        return Err(violation.into());
                    }
                    let sequence = self.frame.header.frame_sequence();
                    tracing::warn!(
                        "Producer restarted: sequence {} after {}",
                        sequence,
                        self.last_sequence
                    );
                    // Frames of the new run that were overwritten before this read.
                    self.frames_dropped += sequence.saturating_sub(1);
                    self.last_sequence = sequence;
                    self.last_timestamp_us = self.frame.header.timestamp_us();
                    self.frames_read += 1;
                    return Ok(Some(&*self.frame));
                }
                tracing::debug!(
                    "Skipping stale slot {} (sequence {}, expected {})",
                    slot,
                    sequence,
                    expected
                );
                continue;
            }

            if sequence > expected {
                let gap = sequence - expected;
                self.frames_dropped += gap;
                tracing::warn!(
                    "Dropped {} frame(s): expected {}, resumed at {}",
                    gap,
                    expected,
                    sequence
                );
            }

            self.last_sequence = sequence;
            self.last_timestamp_us = self.frame.header.timestamp_us();
            self.frames_read += 1;
            tracing::debug!("Read frame {} from slot {}", sequence, slot);
            return Ok(Some(&*self.frame));
        }
    }

    /// Frames successfully read.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Frames lost to overwrite.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Sequence of the last frame returned, 0 before the first read.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Counter snapshot.
    pub fn stats(&self) -> ReaderStats {
        ReaderStats::new(self.frames_read, self.frames_dropped, self.last_sequence)
    }

    /// Channel names, `None` once destroyed.
    pub fn names(&self) -> Option<&ChannelNames> {
        self.channel.as_ref().map(SegmentHandle::names)
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_closed(&self) -> bool {
        self.channel.is_none()
    }

    /// Release the mapping and semaphore. Calling it again is a no-op.
    ///
    /// Counters stay readable after destroy.
    pub fn destroy(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::info!("Reader on {} closed: {}", channel.names().segment, self.stats());
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Slot holding the lowest valid sequence above `after`.
fn oldest_unread_slot(channel: &SegmentHandle, after: u64) -> Option<usize> {
    (0..BUFFER_SLOTS)
        .filter_map(|slot| {
            let header = channel.read_slot_header(slot);
            (header.is_magic_valid() && header.frame_sequence() > after)
                .then_some((header.frame_sequence(), slot))
        })
        .min()
        .map(|(_, slot)| slot)
}

/// Slot holding the oldest frame of a producer that restarted its sequence.
///
/// Such frames carry a sequence no higher than `last_sequence` but were
/// published after the last frame read.
fn restarted_slot(channel: &SegmentHandle, last_sequence: u64, since_us: u64) -> Option<usize> {
    (0..BUFFER_SLOTS)
        .filter_map(|slot| {
            let header = channel.read_slot_header(slot);
            (header.is_magic_valid()
                && header.frame_sequence() <= last_sequence
                && header.timestamp_us() > since_us)
                .then_some((header.frame_sequence(), slot))
        })
        .min()
        .map(|(_, slot)| slot)
}
