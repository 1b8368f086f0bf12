//! Shared segment handle: the mapped ring of slots plus its write semaphore

use crate::error::ShmResult;
use crate::platform::{NamedSemaphore, map_segment, open_segment};
use memmap2::MmapMut;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::sync::atomic::{Ordering, fence};
use viz::config::ChannelConfig;
use viz::consts::{
    BUFFER_SLOTS, HEADER_SIZE, SEGMENT_SIZE, SEM_WRITE_NAME, SHM_NAME, SLOT_SIZE, slot_offset,
};
use viz::frame::FrameHeader;

/// Names of the two kernel objects that make up one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNames {
    /// Shared segment name
    pub segment: String,
    /// Write-availability semaphore name
    pub write_semaphore: String,
}

impl ChannelNames {
    /// Custom channel names.
    pub fn new(segment: impl Into<String>, write_semaphore: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            write_semaphore: write_semaphore.into(),
        }
    }

    /// Channel for `segment` using the protocol's write semaphore.
    pub fn for_segment(segment: impl Into<String>) -> Self {
        Self::new(segment, SEM_WRITE_NAME)
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self::new(SHM_NAME, SEM_WRITE_NAME)
    }
}

impl From<&ChannelConfig> for ChannelNames {
    fn from(config: &ChannelConfig) -> Self {
        Self::new(config.segment_name.clone(), config.write_semaphore.clone())
    }
}

/// Mapped segment and semaphore owned by one process.
///
/// Sub-resources are acquired in the order fd, mapping, semaphore and each is
/// an owning value, so any failure part-way through releases what was already
/// acquired. Fields are declared in reverse acquisition order so that drop
/// releases semaphore, then mapping, then fd.
///
/// Dropping the handle never unlinks the kernel objects; see
/// [`crate::lifecycle::unlink_channel`].
pub struct SegmentHandle {
    semaphore: NamedSemaphore,
    mmap: MmapMut,
    _file: File,
    names: ChannelNames,
}

impl SegmentHandle {
    /// Create (`create = true`) or attach to the channel named by `names`.
    ///
    /// Creation sizes the segment to `BUFFER_SLOTS * SLOT_SIZE` only if it did
    /// not already exist, and creates the semaphore with count 0 if missing.
    /// Attaching requires both objects to exist.
    pub fn create_or_attach(names: &ChannelNames, create: bool) -> ShmResult<Self> {
        let file = open_segment(&names.segment, SEGMENT_SIZE, create)?;
        let mmap = map_segment(&names.segment, &file, SEGMENT_SIZE)?;
        let semaphore = NamedSemaphore::open(&names.write_semaphore, create)?;

        tracing::info!(
            "{} channel {} / {} ({} bytes, {} slots)",
            if create { "Opened" } else { "Attached to" },
            names.segment,
            names.write_semaphore,
            SEGMENT_SIZE,
            BUFFER_SLOTS
        );

        Ok(Self {
            semaphore,
            mmap,
            _file: file,
            names: names.clone(),
        })
    }

    /// Channel names.
    pub fn names(&self) -> &ChannelNames {
        &self.names
    }

    /// Write-availability semaphore.
    pub fn semaphore(&self) -> &NamedSemaphore {
        &self.semaphore
    }

    /// Frames signalled but not yet consumed.
    pub fn pending(&self) -> ShmResult<i32> {
        self.semaphore.value()
    }

    /// Copy a whole slot out of the segment.
    ///
    /// The copy is not synchronized against the writer; a concurrent overwrite
    /// can tear it. Callers detect that through the magic and sequence checks.
    pub fn read_slot(&self, slot: usize, out: &mut [u8; SLOT_SIZE]) {
        fence(Ordering::Acquire);
        // SAFETY: slot_offset(slot % BUFFER_SLOTS) + SLOT_SIZE <= SEGMENT_SIZE,
        // the mapping length; `out` is a distinct local buffer.
        unsafe {
            let src = self.mmap.as_ptr().add(slot_offset(slot % BUFFER_SLOTS));
            std::ptr::copy_nonoverlapping(src, out.as_mut_ptr(), SLOT_SIZE);
        }
    }

    /// Copy only the 64-byte header of a slot.
    pub fn read_slot_header(&self, slot: usize) -> FrameHeader {
        let mut bytes = [0u8; HEADER_SIZE];
        fence(Ordering::Acquire);
        // SAFETY: as in read_slot, HEADER_SIZE < SLOT_SIZE.
        unsafe {
            let src = self.mmap.as_ptr().add(slot_offset(slot % BUFFER_SLOTS));
            std::ptr::copy_nonoverlapping(src, bytes.as_mut_ptr(), HEADER_SIZE);
        }
        FrameHeader::from_bytes(&bytes)
    }

    /// Copy a whole slot into the segment as one contiguous write.
    pub fn write_slot(&mut self, slot: usize, bytes: &[u8; SLOT_SIZE]) {
        // SAFETY: bounds as in read_slot; `bytes` does not alias the mapping.
        unsafe {
            let dst = self.mmap.as_mut_ptr().add(slot_offset(slot % BUFFER_SLOTS));
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, SLOT_SIZE);
        }
        fence(Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::unlink_channel;
    use crate::platform::get_current_pid;
    use viz::consts::MAGIC_NUMBER;
    use viz::frame::Frame;

    fn names(tag: &str) -> ChannelNames {
        let pid = get_current_pid();
        ChannelNames::new(
            format!("/avz_seg_{tag}_{pid}"),
            format!("/avz_seg_{tag}_{pid}_sem"),
        )
    }

    #[test]
    fn protocol_names_by_default() {
        let names = ChannelNames::default();
        assert_eq!(names.segment, "/audioviz_shm");
        assert_eq!(names.write_semaphore, "/audioviz_sem_write");
        assert_eq!(ChannelNames::for_segment("/x").write_semaphore, "/audioviz_sem_write");
    }

    #[test]
    fn slots_are_shared_between_handles() {
        let names = names("shared");
        let _ = unlink_channel(&names);

        let mut producer = SegmentHandle::create_or_attach(&names, true).unwrap();
        let consumer = SegmentHandle::create_or_attach(&names, false).unwrap();

        let frame = Frame::with_bins(FrameHeader::new(3, 0, 44_100, 2), &[0.1, 0.2], &[]).unwrap();
        let mut bytes = [0u8; SLOT_SIZE];
        frame.encode(&mut bytes);
        producer.write_slot(3, &bytes);

        let header = consumer.read_slot_header(3);
        assert_eq!(header.magic(), MAGIC_NUMBER);
        assert_eq!(header.frame_sequence(), 3);

        let mut copy = [0u8; SLOT_SIZE];
        consumer.read_slot(3, &mut copy);
        assert_eq!(Frame::decode(&copy), frame);

        // Untouched slots of a fresh segment are zero.
        assert!(!consumer.read_slot_header(4).is_magic_valid());

        drop((producer, consumer));
        unlink_channel(&names).unwrap();
    }

    #[test]
    fn attach_without_semaphore_releases_segment() {
        let names = names("nosem");
        let _ = unlink_channel(&names);

        // Segment exists, semaphore does not.
        let file = open_segment(&names.segment, SEGMENT_SIZE, true).unwrap();
        drop(file);

        let result = SegmentHandle::create_or_attach(&names, false);
        assert!(matches!(
            result,
            Err(crate::ShmError::ResourceUnavailable { operation: "sem_open", .. })
        ));

        unlink_channel(&names).unwrap();
    }
}
