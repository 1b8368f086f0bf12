//! Prelude module for common re-exports.
//!
//! ```rust
//! use audioviz_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AppConfig, ChannelConfig, ConfigError, ConfigLoader, LogLevel};

// ─── Protocol ───────────────────────────────────────────────────────
pub use crate::consts::{
    BUFFER_SLOTS, MAGIC_NUMBER, MAX_FFT_BINS, SEGMENT_SIZE, SEM_WRITE_NAME, SHM_NAME, SLOT_SIZE,
};
pub use crate::frame::{Frame, FrameHeader, Violation};
