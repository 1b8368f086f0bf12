//! Read-only view of the ring for diagnostics

use crate::segment::SegmentHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use viz::consts::{BUFFER_SLOTS, SLOT_SIZE};
use viz::frame::Frame;

/// Number of leading magnitude bins included in a summary.
pub const PREVIEW_BINS: usize = 5;

/// Decoded header of one slot plus a few magnitude bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSummary {
    /// Slot index
    pub slot: usize,
    /// Magic number matched the protocol
    pub valid_magic: bool,
    /// Raw magic value
    pub magic: u32,
    /// Frame sequence
    pub frame_sequence: u64,
    /// Producer timestamp in microseconds
    pub timestamp_us: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Populated bins
    pub bin_count: u32,
    /// First magnitude bins
    pub magnitude_preview: [f32; PREVIEW_BINS],
}

impl SlotSummary {
    fn from_frame(slot: usize, frame: &Frame) -> Self {
        let header = &frame.header;
        let mut magnitude_preview = [0.0; PREVIEW_BINS];
        magnitude_preview.copy_from_slice(&frame.magnitude[..PREVIEW_BINS]);
        Self {
            slot,
            valid_magic: header.is_magic_valid(),
            magic: header.magic(),
            frame_sequence: header.frame_sequence(),
            timestamp_us: header.timestamp_us(),
            sample_rate: header.sample_rate(),
            bin_count: header.bin_count(),
            magnitude_preview,
        }
    }
}

impl fmt::Display for SlotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot {}: magic=0x{:08X} ({}) seq={} ts={}us rate={} bins={} mag[0..{}]={:.3?}",
            self.slot,
            self.magic,
            if self.valid_magic { "ok" } else { "invalid" },
            self.frame_sequence,
            self.timestamp_us,
            self.sample_rate,
            self.bin_count,
            PREVIEW_BINS,
            self.magnitude_preview
        )
    }
}

/// Summarize every slot. Does not touch the semaphore.
pub fn snapshot(channel: &SegmentHandle) -> Vec<SlotSummary> {
    let mut bytes = Box::new([0u8; SLOT_SIZE]);
    (0..BUFFER_SLOTS)
        .map(|slot| {
            channel.read_slot(slot, &mut bytes);
            SlotSummary::from_frame(slot, &Frame::decode(&bytes))
        })
        .collect()
}
