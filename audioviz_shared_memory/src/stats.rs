//! Reader statistics snapshot

use crate::error::ShmResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters of one reader handle at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaderStats {
    /// Frames successfully validated and returned
    pub frames_read: u64,
    /// Frames overwritten before they could be read
    pub frames_dropped: u64,
    /// Sequence of the last frame returned, 0 before the first
    pub last_sequence: u64,
    /// `frames_dropped / (frames_read + frames_dropped)`, 0 when both are 0
    pub drop_ratio: f64,
}

impl ReaderStats {
    /// Snapshot from raw counters.
    pub fn new(frames_read: u64, frames_dropped: u64, last_sequence: u64) -> Self {
        let produced = frames_read + frames_dropped;
        let drop_ratio = if produced == 0 {
            0.0
        } else {
            frames_dropped as f64 / produced as f64
        };
        Self {
            frames_read,
            frames_dropped,
            last_sequence,
            drop_ratio,
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> ShmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ReaderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read={} dropped={} last_sequence={} drop_ratio={:.2}%",
            self.frames_read,
            self.frames_dropped,
            self.last_sequence,
            self.drop_ratio * 100.0
        )
    }
}
