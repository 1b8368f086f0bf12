//! Removal of the kernel-visible channel objects

use crate::error::ShmResult;
use crate::platform::{unlink_segment, unlink_semaphore};
use crate::segment::ChannelNames;
use serde::{Deserialize, Serialize};

/// What [`unlink_channel`] actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkReport {
    /// Segment name existed and was removed
    pub segment_removed: bool,
    /// Semaphore name existed and was removed
    pub semaphore_removed: bool,
}

impl UnlinkReport {
    /// Whether anything was removed.
    pub fn any_removed(&self) -> bool {
        self.segment_removed || self.semaphore_removed
    }
}

/// Remove the segment and semaphore names of a channel.
///
/// Processes that still have them open keep working; the objects go away once
/// the last handle is closed. A name that does not exist is not an error.
/// Both removals are attempted even if the first one fails.
pub fn unlink_channel(names: &ChannelNames) -> ShmResult<UnlinkReport> {
    let segment = unlink_segment(&names.segment);
    let semaphore = unlink_semaphore(&names.write_semaphore);

    let report = UnlinkReport {
        segment_removed: segment?,
        semaphore_removed: semaphore?,
    };

    tracing::info!(
        "Unlinked {} (removed: {}) and {} (removed: {})",
        names.segment,
        report.segment_removed,
        names.write_semaphore,
        report.semaphore_removed
    );
    Ok(report)
}
