//! Frame wire layout.
//!
//! A slot holds exactly one [`Frame`]:
//!
//! ```text
//! offset  size  field
//! ------  ----  ---------------------------------------------
//!      0     4  magic           u32 LE, MAGIC_NUMBER
//!      4     8  frame_sequence  u64 LE, +1 per frame, starts at 1
//!     12     8  timestamp_us    u64 LE, producer clock
//!     20     4  sample_rate     u32 LE
//!     24     4  bin_count       u32 LE, <= MAX_FFT_BINS
//!     28    36  reserved        zero
//!     64  2048  magnitude       512 x f32 LE, normalized 0..1
//!   2112  2048  phase           512 x f32 LE, radians
//!   4160  4032  padding         zero
//! ```
//!
//! [`FrameHeader`] stores every field as a little-endian byte array, which gives
//! it alignment 1 and no compiler-inserted padding on any target. Bin values are
//! converted explicitly in [`Frame::encode`] / [`Frame::decode`] so the wire
//! format does not depend on host endianness.

use crate::consts::{
    BIN_SIZE, FRAME_PADDING, HEADER_SIZE, MAGIC_NUMBER, MAX_FFT_BINS, SLOT_SIZE,
};
use core::mem::{align_of, offset_of, size_of};
use static_assertions::const_assert_eq;
use std::fmt;
use thiserror::Error;

const MAGIC_OFFSET: usize = 0;
const SEQUENCE_OFFSET: usize = 4;
const TIMESTAMP_OFFSET: usize = 12;
const SAMPLE_RATE_OFFSET: usize = 20;
const BIN_COUNT_OFFSET: usize = 24;
const RESERVED_OFFSET: usize = 28;
const RESERVED_SIZE: usize = HEADER_SIZE - RESERVED_OFFSET;

/// Byte offset of the magnitude array inside a slot.
pub const MAGNITUDE_OFFSET: usize = HEADER_SIZE;
/// Byte offset of the phase array inside a slot.
pub const PHASE_OFFSET: usize = MAGNITUDE_OFFSET + MAX_FFT_BINS * BIN_SIZE;
/// Byte offset of the trailing zero padding inside a slot.
pub const PADDING_OFFSET: usize = PHASE_OFFSET + MAX_FFT_BINS * BIN_SIZE;

/// Reasons a frame is rejected by the writer or the reader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    /// Slot does not start with [`MAGIC_NUMBER`].
    #[error("invalid magic number {found:#010x} (expected {MAGIC_NUMBER:#010x})")]
    BadMagic {
        /// Value found at offset 0
        found: u32,
    },

    /// `bin_count` above [`MAX_FFT_BINS`].
    #[error("bin_count {bin_count} exceeds maximum of {MAX_FFT_BINS}")]
    BinCountExceeded {
        /// Requested bin count
        bin_count: u32,
    },

    /// A bin slice holds fewer values than `bin_count`.
    #[error("{field} has {len} values, bin_count is {bin_count}")]
    PayloadTooShort {
        /// `"magnitude"` or `"phase"`
        field: &'static str,
        /// Slice length
        len: usize,
        /// Requested bin count
        bin_count: u32,
    },

    /// A bin slice holds more values than a frame can carry.
    #[error("{field} has {len} values, a frame carries at most {MAX_FFT_BINS}")]
    PayloadTooLong {
        /// `"magnitude"` or `"phase"`
        field: &'static str,
        /// Slice length
        len: usize,
    },
}

/// Frame header: 64 bytes, little-endian, alignment 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct FrameHeader {
    magic: [u8; 4],
    frame_sequence: [u8; 8],
    timestamp_us: [u8; 8],
    sample_rate: [u8; 4],
    bin_count: [u8; 4],
    reserved: [u8; RESERVED_SIZE],
}

const_assert_eq!(size_of::<FrameHeader>(), HEADER_SIZE);
const_assert_eq!(align_of::<FrameHeader>(), 1);
const_assert_eq!(offset_of!(FrameHeader, magic), MAGIC_OFFSET);
const_assert_eq!(offset_of!(FrameHeader, frame_sequence), SEQUENCE_OFFSET);
const_assert_eq!(offset_of!(FrameHeader, timestamp_us), TIMESTAMP_OFFSET);
const_assert_eq!(offset_of!(FrameHeader, sample_rate), SAMPLE_RATE_OFFSET);
const_assert_eq!(offset_of!(FrameHeader, bin_count), BIN_COUNT_OFFSET);
const_assert_eq!(offset_of!(FrameHeader, reserved), RESERVED_OFFSET);

impl FrameHeader {
    /// Header with a valid magic number and zeroed reserved bytes.
    pub const fn new(
        frame_sequence: u64,
        timestamp_us: u64,
        sample_rate: u32,
        bin_count: u32,
    ) -> Self {
        Self {
            magic: MAGIC_NUMBER.to_le_bytes(),
            frame_sequence: frame_sequence.to_le_bytes(),
            timestamp_us: timestamp_us.to_le_bytes(),
            sample_rate: sample_rate.to_le_bytes(),
            bin_count: bin_count.to_le_bytes(),
            reserved: [0u8; RESERVED_SIZE],
        }
    }

    /// All-zero header, as found in a freshly created segment.
    pub const fn zeroed() -> Self {
        Self {
            magic: [0; 4],
            frame_sequence: [0; 8],
            timestamp_us: [0; 8],
            sample_rate: [0; 4],
            bin_count: [0; 4],
            reserved: [0; RESERVED_SIZE],
        }
    }

    /// Decode a header from its 64 wire bytes.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: field(bytes, MAGIC_OFFSET),
            frame_sequence: field(bytes, SEQUENCE_OFFSET),
            timestamp_us: field(bytes, TIMESTAMP_OFFSET),
            sample_rate: field(bytes, SAMPLE_RATE_OFFSET),
            bin_count: field(bytes, BIN_COUNT_OFFSET),
            reserved: field(bytes, RESERVED_OFFSET),
        }
    }

    /// Encode the header into its 64 wire bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[MAGIC_OFFSET..SEQUENCE_OFFSET].copy_from_slice(&self.magic);
        out[SEQUENCE_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.frame_sequence);
        out[TIMESTAMP_OFFSET..SAMPLE_RATE_OFFSET].copy_from_slice(&self.timestamp_us);
        out[SAMPLE_RATE_OFFSET..BIN_COUNT_OFFSET].copy_from_slice(&self.sample_rate);
        out[BIN_COUNT_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.bin_count);
        out[RESERVED_OFFSET..].copy_from_slice(&self.reserved);
        out
    }

    /// Magic number.
    #[inline]
    pub const fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    /// Producer-assigned sequence number.
    #[inline]
    pub const fn frame_sequence(&self) -> u64 {
        u64::from_le_bytes(self.frame_sequence)
    }

    /// Producer timestamp in microseconds.
    #[inline]
    pub const fn timestamp_us(&self) -> u64 {
        u64::from_le_bytes(self.timestamp_us)
    }

    /// Audio sample rate in Hz.
    #[inline]
    pub const fn sample_rate(&self) -> u32 {
        u32::from_le_bytes(self.sample_rate)
    }

    /// Number of populated bins.
    #[inline]
    pub const fn bin_count(&self) -> u32 {
        u32::from_le_bytes(self.bin_count)
    }

    /// Reserved bytes as stored.
    #[inline]
    pub const fn reserved(&self) -> &[u8; RESERVED_SIZE] {
        &self.reserved
    }

    /// Overwrite the magic number.
    pub fn set_magic(&mut self, magic: u32) {
        self.magic = magic.to_le_bytes();
    }

    /// Overwrite the sequence number.
    pub fn set_frame_sequence(&mut self, frame_sequence: u64) {
        self.frame_sequence = frame_sequence.to_le_bytes();
    }

    /// Overwrite the timestamp.
    pub fn set_timestamp_us(&mut self, timestamp_us: u64) {
        self.timestamp_us = timestamp_us.to_le_bytes();
    }

    /// Overwrite the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.to_le_bytes();
    }

    /// Overwrite the bin count.
    pub fn set_bin_count(&mut self, bin_count: u32) {
        self.bin_count = bin_count.to_le_bytes();
    }

    /// Whether the magic number matches the protocol.
    #[inline]
    pub const fn is_magic_valid(&self) -> bool {
        self.magic() == MAGIC_NUMBER
    }

    /// `Ok` when the magic number matches, [`Violation::BadMagic`] otherwise.
    pub fn check_magic(&self) -> Result<(), Violation> {
        if self.is_magic_valid() {
            Ok(())
        } else {
            Err(Violation::BadMagic {
                found: self.magic(),
            })
        }
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// One complete slot: header, 512 magnitude bins, 512 phase bins, zero padding.
#[derive(Clone, PartialEq)]
#[repr(C)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Magnitude bins, normalized 0..1. Entries past `bin_count` are zero.
    pub magnitude: [f32; MAX_FFT_BINS],
    /// Phase bins in radians. Entries past `bin_count` are zero.
    pub phase: [f32; MAX_FFT_BINS],
    padding: [u8; FRAME_PADDING],
}

const_assert_eq!(size_of::<Frame>(), SLOT_SIZE);
const_assert_eq!(offset_of!(Frame, magnitude), MAGNITUDE_OFFSET);
const_assert_eq!(offset_of!(Frame, phase), PHASE_OFFSET);
const_assert_eq!(offset_of!(Frame, padding), PADDING_OFFSET);

impl Frame {
    /// All-zero frame.
    pub const fn zeroed() -> Self {
        Self {
            header: FrameHeader::zeroed(),
            magnitude: [0.0; MAX_FFT_BINS],
            phase: [0.0; MAX_FFT_BINS],
            padding: [0; FRAME_PADDING],
        }
    }

    /// Build a frame from bin slices. See [`Frame::set_bins`] for the rules.
    pub fn with_bins(
        header: FrameHeader,
        magnitude: &[f32],
        phase: &[f32],
    ) -> Result<Self, Violation> {
        let mut frame = Self::zeroed();
        frame.header = header;
        frame.set_bins(magnitude, phase, header.bin_count())?;
        Ok(frame)
    }

    /// Copy `bin_count` bins into the frame and zero everything after them.
    ///
    /// `magnitude` must hold at least `bin_count` values. `phase` may be empty
    /// (phase is optional) but otherwise must also cover `bin_count`. Neither
    /// slice may exceed [`MAX_FFT_BINS`]; oversized input is rejected, never
    /// truncated. On error the frame is left unchanged.
    pub fn set_bins(
        &mut self,
        magnitude: &[f32],
        phase: &[f32],
        bin_count: u32,
    ) -> Result<(), Violation> {
        validate_bins(magnitude, phase, bin_count)?;
        let n = bin_count as usize;

        self.magnitude[..n].copy_from_slice(&magnitude[..n]);
        self.magnitude[n..].fill(0.0);
        if phase.is_empty() {
            self.phase.fill(0.0);
        } else {
            self.phase[..n].copy_from_slice(&phase[..n]);
            self.phase[n..].fill(0.0);
        }
        self.header.set_bin_count(bin_count);
        Ok(())
    }

    /// Populated magnitude bins (the first `bin_count`, clamped to [`MAX_FFT_BINS`]).
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitude[..self.populated_bins()]
    }

    /// Populated phase bins.
    pub fn phases(&self) -> &[f32] {
        &self.phase[..self.populated_bins()]
    }

    fn populated_bins(&self) -> usize {
        (self.header.bin_count() as usize).min(MAX_FFT_BINS)
    }

    /// Serialize into slot bytes. Padding is always written as zero.
    pub fn encode(&self, out: &mut [u8; SLOT_SIZE]) {
        out[..HEADER_SIZE].copy_from_slice(&self.header.to_bytes());
        encode_bins(&self.magnitude, &mut out[MAGNITUDE_OFFSET..PHASE_OFFSET]);
        encode_bins(&self.phase, &mut out[PHASE_OFFSET..PADDING_OFFSET]);
        out[PADDING_OFFSET..].fill(0);
    }

    /// Deserialize from slot bytes. No validation is performed; see
    /// [`FrameHeader::check_magic`].
    pub fn decode(bytes: &[u8; SLOT_SIZE]) -> Self {
        let mut frame = Self::zeroed();
        frame.header = FrameHeader::from_bytes(&field(bytes, 0));
        decode_bins(&bytes[MAGNITUDE_OFFSET..PHASE_OFFSET], &mut frame.magnitude);
        decode_bins(&bytes[PHASE_OFFSET..PADDING_OFFSET], &mut frame.phase);
        frame
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("frame_sequence", &self.header.frame_sequence())
            .field("timestamp_us", &self.header.timestamp_us())
            .field("sample_rate", &self.header.sample_rate())
            .field("bin_count", &self.header.bin_count())
            .field("magic_valid", &self.header.is_magic_valid())
            .finish_non_exhaustive()
    }
}

/// Check bin slices against `bin_count` without building a frame.
pub fn validate_bins(magnitude: &[f32], phase: &[f32], bin_count: u32) -> Result<(), Violation> {
    if bin_count as usize > MAX_FFT_BINS {
        return Err(Violation::BinCountExceeded { bin_count });
    }
    for (name, values) in [("magnitude", magnitude), ("phase", phase)] {
        if values.len() > MAX_FFT_BINS {
            return Err(Violation::PayloadTooLong {
                field: name,
                len: values.len(),
            });
        }
    }
    if magnitude.len() < bin_count as usize {
        return Err(Violation::PayloadTooShort {
            field: "magnitude",
            len: magnitude.len(),
            bin_count,
        });
    }
    if !phase.is_empty() && phase.len() < bin_count as usize {
        return Err(Violation::PayloadTooShort {
            field: "phase",
            len: phase.len(),
            bin_count,
        });
    }
    Ok(())
}

fn field<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

fn encode_bins(values: &[f32; MAX_FFT_BINS], out: &mut [u8]) {
    for (chunk, value) in out.chunks_exact_mut(BIN_SIZE).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn decode_bins(bytes: &[u8], out: &mut [f32; MAX_FFT_BINS]) {
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(BIN_SIZE)) {
        *value = f32::from_le_bytes(field(chunk, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_land_at_protocol_offsets() {
        let header = FrameHeader::new(0x0102_0304_0506_0708, 0x1112_1314_1516_1718, 44_100, 256);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..4], &[0x46, 0x5A, 0x49, 0x56]);
        assert_eq!(&bytes[4..12], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..20], &0x1112_1314_1516_1718u64.to_le_bytes());
        assert_eq!(&bytes[20..24], &44_100u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &256u32.to_le_bytes());
        assert!(bytes[28..].iter().all(|&b| b == 0));
    }

    #[test]
    fn magic_validation() {
        let mut header = FrameHeader::new(1, 0, 48_000, 10);
        assert!(header.is_magic_valid());
        assert!(header.check_magic().is_ok());

        header.set_magic(0xDEAD_BEEF);
        assert_eq!(
            header.check_magic(),
            Err(Violation::BadMagic { found: 0xDEAD_BEEF })
        );
        assert!(!FrameHeader::zeroed().is_magic_valid());
    }

    #[test]
    fn bin_count_above_max_is_rejected() {
        let magnitude = vec![0.5f32; MAX_FFT_BINS];
        let result = Frame::with_bins(FrameHeader::new(1, 0, 44_100, 513), &magnitude, &[]);
        assert_eq!(result, Err(Violation::BinCountExceeded { bin_count: 513 }));
    }

    #[test]
    fn oversized_slices_are_not_truncated() {
        let magnitude = vec![0.5f32; MAX_FFT_BINS + 1];
        let mut frame = Frame::zeroed();
        assert!(matches!(
            frame.set_bins(&magnitude, &[], 16),
            Err(Violation::PayloadTooLong { field: "magnitude", .. })
        ));
        assert_eq!(frame.header.bin_count(), 0);
    }

    #[test]
    fn short_phase_is_rejected_but_empty_phase_is_allowed() {
        let magnitude = [0.25f32; 8];
        let mut frame = Frame::zeroed();
        assert!(matches!(
            frame.set_bins(&magnitude, &[1.0; 4], 8),
            Err(Violation::PayloadTooShort { field: "phase", len: 4, bin_count: 8 })
        ));
        assert!(frame.set_bins(&magnitude, &[], 8).is_ok());
        assert!(frame.phases().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn tail_past_bin_count_is_zeroed() {
        let mut frame = Frame::zeroed();
        frame.set_bins(&[1.0; MAX_FFT_BINS], &[2.0; MAX_FFT_BINS], 512).unwrap();
        frame.set_bins(&[0.5; 4], &[0.1; 4], 4).unwrap();

        assert_eq!(frame.magnitudes(), &[0.5; 4]);
        assert!(frame.magnitude[4..].iter().all(|&m| m == 0.0));
        assert!(frame.phase[4..].iter().all(|&p| p == 0.0));
    }

    #[test]
    fn encode_decode_preserves_exact_values() {
        let mut magnitude = [0.0f32; 256];
        magnitude[0] = 0.73;
        let header = FrameHeader::new(7, 1_700_000_000_000_000, 44_100, 256);
        let frame = Frame::with_bins(header, &magnitude, &[]).unwrap();

        let mut slot = [0xFFu8; SLOT_SIZE];
        frame.encode(&mut slot);
        assert!(slot[PADDING_OFFSET..].iter().all(|&b| b == 0));

        let decoded = Frame::decode(&slot);
        assert_eq!(decoded.header.sample_rate(), 44_100);
        assert_eq!(decoded.header.bin_count(), 256);
        assert_eq!(decoded.magnitude[0], 0.73);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn magnitude_is_little_endian_on_the_wire() {
        let frame = Frame::with_bins(FrameHeader::new(1, 0, 44_100, 1), &[1.0], &[-1.0]).unwrap();
        let mut slot = [0u8; SLOT_SIZE];
        frame.encode(&mut slot);

        assert_eq!(&slot[MAGNITUDE_OFFSET..MAGNITUDE_OFFSET + 4], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&slot[PHASE_OFFSET..PHASE_OFFSET + 4], &[0x00, 0x00, 0x80, 0xBF]);
    }
}
