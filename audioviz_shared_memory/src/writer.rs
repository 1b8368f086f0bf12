//! Producer side of the frame ring

use crate::error::{ShmError, ShmResult};
use crate::segment::{ChannelNames, SegmentHandle};
use std::time::{SystemTime, UNIX_EPOCH};
use viz::consts::{SLOT_SIZE, slot_for_sequence};
use viz::frame::{Frame, FrameHeader, validate_bins};

/// Single producer writing frames into the ring.
///
/// Each successful [`write`](Self::write) fills slot `sequence % 8` and posts
/// the write semaphore once. The writer never waits for the reader; a reader
/// more than eight frames behind loses the oldest unread frames.
pub struct FrameWriter {
    channel: Option<SegmentHandle>,
    next_sequence: u64,
    frame: Box<Frame>,
    slot_bytes: Box<[u8; SLOT_SIZE]>,
}

impl FrameWriter {
    /// Open the channel whose segment is `name`, using the protocol semaphore.
    pub fn init(name: &str, create: bool) -> ShmResult<Self> {
        Self::init_with(&ChannelNames::for_segment(name), create)
    }

    /// Open the channel named by `names`.
    pub fn init_with(names: &ChannelNames, create: bool) -> ShmResult<Self> {
        let channel = SegmentHandle::create_or_attach(names, create)?;
        Ok(Self {
            channel: Some(channel),
            next_sequence: 1,
            frame: Box::new(Frame::zeroed()),
            slot_bytes: Box::new([0u8; SLOT_SIZE]),
        })
    }

    /// Publish one frame. Returns the sequence number it was written with.
    ///
    /// `magnitude` must hold at least `bin_count` values and `phase` is either
    /// empty or as long as `magnitude` needs to be. Nothing is written and no
    /// sequence number is consumed when validation fails.
    pub fn write(
        &mut self,
        magnitude: &[f32],
        phase: &[f32],
        sample_rate: u32,
        bin_count: u32,
    ) -> ShmResult<u64> {
        let channel = self.channel.as_mut().ok_or(ShmError::Closed)?;
        validate_bins(magnitude, phase, bin_count)?;

        let sequence = self.next_sequence;
        self.frame.header = FrameHeader::new(sequence, timestamp_us(), sample_rate, bin_count);
        self.frame.set_bins(magnitude, phase, bin_count)?;
        self.frame.encode(&mut self.slot_bytes);

        let slot = slot_for_sequence(sequence);
        channel.write_slot(slot, &self.slot_bytes);
        channel.semaphore().post()?;
        self.next_sequence += 1;

        tracing::debug!("Wrote frame {} to slot {} ({} bins)", sequence, slot, bin_count);
        Ok(sequence)
    }

    /// Publish the bins of an existing frame.
    ///
    /// Magic, sequence and timestamp are assigned by the writer; only
    /// `sample_rate`, `bin_count` and the populated bins are taken from `frame`.
    pub fn write_frame(&mut self, frame: &Frame) -> ShmResult<u64> {
        let header = frame.header;
        self.write(
            frame.magnitudes(),
            frame.phases(),
            header.sample_rate(),
            header.bin_count(),
        )
    }

    /// Sequence number the next successful write will use.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
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
    /// The kernel objects stay in place; see [`crate::unlink_channel`].
    pub fn destroy(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::info!(
                "Writer on {} closed after {} frames",
                channel.names().segment,
                self.next_sequence - 1
            );
        }
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::unlink_channel;
    use crate::platform::get_current_pid;
    use viz::frame::Violation;

    fn names(tag: &str) -> ChannelNames {
        let pid = get_current_pid();
        ChannelNames::new(format!("/avz_wr_{tag}_{pid}"), format!("/avz_wr_{tag}_{pid}_sem"))
    }

    #[test]
    fn sequences_start_at_one_and_post_once_each() {
        let names = names("seq");
        let _ = unlink_channel(&names);
        let mut writer = FrameWriter::init_with(&names, true).unwrap();
        let probe = SegmentHandle::create_or_attach(&names, false).unwrap();

        assert_eq!(writer.next_sequence(), 1);
        assert_eq!(writer.write(&[0.5; 16], &[], 48_000, 16).unwrap(), 1);
        assert_eq!(writer.write(&[0.5; 16], &[], 48_000, 16).unwrap(), 2);
        assert_eq!(writer.next_sequence(), 3);
        assert_eq!(probe.pending().unwrap(), 2);

        let header = probe.read_slot_header(2);
        assert_eq!(header.frame_sequence(), 2);
        assert_eq!(header.sample_rate(), 48_000);
        assert!(header.timestamp_us() > 0);

        drop((writer, probe));
        unlink_channel(&names).unwrap();
    }

    #[test]
    fn rejected_write_consumes_nothing() {
        let names = names("reject");
        let _ = unlink_channel(&names);
        let mut writer = FrameWriter::init_with(&names, true).unwrap();

        let err = writer.write(&[0.0; 512], &[], 44_100, 513).unwrap_err();
        assert!(matches!(
            err,
            ShmError::ProtocolViolation(Violation::BinCountExceeded { bin_count: 513 })
        ));
        let err = writer.write(&[0.0; 600], &[], 44_100, 10).unwrap_err();
        assert!(matches!(
            err,
            ShmError::ProtocolViolation(Violation::PayloadTooLong { len: 600, .. })
        ));

        assert_eq!(writer.next_sequence(), 1);
        let probe = SegmentHandle::create_or_attach(&names, false).unwrap();
        assert_eq!(probe.pending().unwrap(), 0);

        drop((writer, probe));
        unlink_channel(&names).unwrap();
    }

    #[test]
    fn destroy_is_idempotent() {
        let names = names("destroy");
        let _ = unlink_channel(&names);
        let mut writer = FrameWriter::init_with(&names, true).unwrap();

        writer.destroy();
        writer.destroy();
        assert!(writer.is_closed());
        assert!(writer.names().is_none());
        assert!(matches!(writer.write(&[], &[], 44_100, 0), Err(ShmError::Closed)));

        unlink_channel(&names).unwrap();
    }
}
