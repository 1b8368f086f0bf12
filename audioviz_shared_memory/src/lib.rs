//! # Audioviz Shared Memory Transport
//!
//! Moves spectral-analysis frames from one producer process to one consumer
//! process through a fixed ring of eight 8192-byte slots in a POSIX shared
//! memory segment. A named counting semaphore tells the consumer how many
//! frames have been published and not yet taken.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────────┐    ┌─────────────────┐
//! │   Producer      │    │  /audioviz_shm (64 KiB)  │    │   Consumer      │
//! │                 │    │                          │    │                 │
//! │  FrameWriter    ├───►│ slot0 slot1 ... slot7    ├───►│  FrameReader    │
//! │  seq % 8        │    │                          │    │  drop detection │
//! └────────┬────────┘    └──────────────────────────┘    └────────▲────────┘
//!          │                                                      │
//!          │             ┌──────────────────────────┐             │
//!          └── post ────►│  /audioviz_sem_write     ├─── wait ────┘
//!                        └──────────────────────────┘
//! ```
//!
//! The writer never blocks. A consumer that falls more than eight frames
//! behind loses the oldest unread frames; the loss shows up in
//! [`FrameReader::frames_dropped`], never as an error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use audioviz_shared_memory::{FrameReader, FrameWriter, SHM_NAME};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Producer
//! let mut writer = FrameWriter::init(SHM_NAME, true)?;
//! let magnitude = [0.0f32; 512];
//! writer.write(&magnitude, &[], 44_100, 512)?;
//!
//! // Consumer
//! let mut reader = FrameReader::init(SHM_NAME, false)?;
//! if let Some(frame) = reader.read_frame(100)? {
//!     println!("frame {} with {} bins", frame.header.frame_sequence(), frame.header.bin_count());
//! }
//! println!("read={} dropped={}", reader.frames_read(), reader.frames_dropped());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use audioviz_shared_memory::{FrameReader, SHM_NAME, ShmError};
//!
//! match FrameReader::init(SHM_NAME, false) {
//!     Ok(_reader) => { /* read loop */ }
//!     Err(ShmError::ResourceUnavailable { name, operation, .. }) => {
//!         eprintln!("{operation} failed for {name}: is the producer running?");
//!     }
//!     Err(e) => eprintln!("Unexpected error: {e}"),
//! }
//! ```
//!
//! ## Lifecycle
//!
//! `destroy` (or drop) only closes the local mapping and semaphore. The kernel
//! objects persist until [`unlink_channel`] removes them.
//!
//! ## Platform Support
//!
//! Linux only: timed semaphore waits rely on `sem_timedwait`.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod inspect;
pub mod lifecycle;
pub mod platform;
pub mod reader;
pub mod segment;
pub mod stats;
pub mod writer;

pub use error::{ShmError, ShmResult};
pub use inspect::{SlotSummary, snapshot};
pub use lifecycle::{UnlinkReport, unlink_channel};
pub use reader::FrameReader;
pub use segment::{ChannelNames, SegmentHandle};
pub use stats::ReaderStats;
pub use viz::consts::{
    BUFFER_SLOTS, MAGIC_NUMBER, SEGMENT_SIZE, SEM_WRITE_NAME, SHM_NAME, SLOT_SIZE,
};
pub use viz::frame::{Frame, FrameHeader, Violation};
pub use writer::FrameWriter;

/// Initialize a plain-text tracing subscriber driven by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
