//! Error types for shared memory operations

use thiserror::Error;
use viz::frame::Violation;

/// Errors that can occur during shared memory operations.
///
/// A read timeout is not an error: [`crate::FrameReader::read_frame`] reports
/// it as `Ok(None)`. Sequence gaps are not errors either; they only show up in
/// the reader statistics.
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment or semaphore could not be created, opened, sized or mapped
    #[error("Resource unavailable: {operation} {name}: {source}")]
    ResourceUnavailable {
        /// POSIX object name
        name: String,
        /// Step that failed (`shm_open`, `ftruncate`, `mmap`, `sem_open`, ...)
        operation: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Frame rejected: bad magic on read, or invalid bins on write
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] Violation),

    /// Handle was destroyed
    #[error("Channel handle already destroyed")]
    Closed,

    /// Semaphore wait or post failed for a reason other than timeout
    #[error("Semaphore {operation} failed on {name}: {source}")]
    Semaphore {
        /// Semaphore name
        name: String,
        /// `sem_wait`, `sem_timedwait` or `sem_post`
        operation: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },
}

impl ShmError {
    /// Build a [`ShmError::ResourceUnavailable`].
    pub fn unavailable(
        name: &str,
        operation: &'static str,
        source: impl Into<std::io::Error>,
    ) -> Self {
        Self::ResourceUnavailable {
            name: name.to_string(),
            operation,
            source: source.into(),
        }
    }

    /// Whether the error is a rejected frame the caller may skip and retry past.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
