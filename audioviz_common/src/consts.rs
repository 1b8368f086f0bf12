//! Protocol constants.
//!
//! These values are the wire contract between the analyzer (producer) and the
//! renderer (consumer). Both processes must agree on every one of them; they are
//! the single source of truth for all other crates in the workspace.

/// Magic number at offset 0 of every frame: `"VIZF"` read as a little-endian `u32`.
pub const MAGIC_NUMBER: u32 = 0x5649_5A46;

/// Number of slots in the ring.
pub const BUFFER_SLOTS: usize = 8;

/// Size of one slot (one `Frame`) in bytes.
pub const SLOT_SIZE: usize = 8192;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Maximum number of magnitude/phase bins carried by a frame.
pub const MAX_FFT_BINS: usize = 512;

/// Size of one bin value (`f32`) on the wire.
pub const BIN_SIZE: usize = 4;

/// Zero padding at the end of every frame.
pub const FRAME_PADDING: usize = SLOT_SIZE - HEADER_SIZE - 2 * MAX_FFT_BINS * BIN_SIZE;

/// Total size of the shared segment: `BUFFER_SLOTS * SLOT_SIZE` = 65536 bytes.
pub const SEGMENT_SIZE: usize = BUFFER_SLOTS * SLOT_SIZE;

/// Name of the shared segment.
pub const SHM_NAME: &str = "/audioviz_shm";

/// Name of the counting semaphore signalled once per written frame.
pub const SEM_WRITE_NAME: &str = "/audioviz_sem_write";

/// Reserved by the protocol. Neither the writer nor the reader opens it.
pub const SEM_READ_NAME: &str = "/audioviz_sem_read";

/// Default sample rate used by the synthetic producer.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default producer frame rate (~44100 / 1024).
pub const DEFAULT_TARGET_FPS: u32 = 43;

/// Default reader wait in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 100;

/// Slot index for a frame sequence.
#[inline]
pub const fn slot_for_sequence(sequence: u64) -> usize {
    (sequence % BUFFER_SLOTS as u64) as usize
}

/// Byte offset of a slot inside the segment.
#[inline]
pub const fn slot_offset(slot: usize) -> usize {
    slot * SLOT_SIZE
}
