//! Linux-specific shared memory and semaphore operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::sys::time::TimeSpec;
use nix::time::{ClockId, clock_gettime};
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::ptr::NonNull;
use std::time::Duration;

/// Owner read/write only.
const OBJECT_MODE: libc::mode_t = libc::S_IRUSR | libc::S_IWUSR;

/// Open the named segment, creating and sizing it only if it did not exist.
///
/// With `create = true` an exclusive create is tried first; only that path
/// truncates. An object that already exists is reopened untouched, so a peer's
/// live mapping is never resized underneath it. The single exception is a
/// zero-length object (creator died before sizing), which is sized here.
pub fn open_segment(name: &str, size: usize, create: bool) -> ShmResult<File> {
    let mode = Mode::from_bits_truncate(OBJECT_MODE);

    if create {
        match shm_open(name, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, mode) {
            Ok(fd) => {
                let file = File::from(fd);
                if let Err(e) = file.set_len(size as u64) {
                    drop(file);
                    let _ = shm_unlink(name);
                    return Err(ShmError::unavailable(name, "ftruncate", e));
                }
                tracing::debug!("Created segment {} ({} bytes)", name, size);
                return Ok(file);
            }
            Err(Errno::EEXIST) => {
                tracing::debug!("Segment {} already exists, opening without truncation", name);
            }
            Err(e) => return Err(ShmError::unavailable(name, "shm_open", e)),
        }
    }

    let fd = shm_open(name, OFlag::O_RDWR, Mode::empty())
        .map_err(|e| ShmError::unavailable(name, "shm_open", e))?;
    let file = File::from(fd);

    let len = file
        .metadata()
        .map_err(|e| ShmError::unavailable(name, "fstat", e))?
        .len();

    if len == 0 && create {
        file.set_len(size as u64)
            .map_err(|e| ShmError::unavailable(name, "ftruncate", e))?;
    } else if len < size as u64 {
        return Err(ShmError::unavailable(
            name,
            "fstat",
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("segment is {len} bytes, protocol requires {size}"),
            ),
        ));
    }

    Ok(file)
}

/// Map `size` bytes of the segment read/write, shared.
pub fn map_segment(name: &str, file: &File, size: usize) -> ShmResult<MmapMut> {
    // SAFETY: the mapping is MAP_SHARED over a POSIX shm object that peers
    // write concurrently; all access goes through raw copies, never references
    // into the mapping that outlive a single copy.
    unsafe { MmapOptions::new().len(size).map_mut(file) }
        .map_err(|e| ShmError::unavailable(name, "mmap", e))
}

/// Remove a segment name. Returns `false` if it did not exist.
pub fn unlink_segment(name: &str) -> ShmResult<bool> {
    match shm_unlink(name) {
        Ok(()) => Ok(true),
        Err(Errno::ENOENT) => Ok(false),
        Err(e) => Err(ShmError::unavailable(name, "shm_unlink", e)),
    }
}

/// POSIX named counting semaphore.
///
/// Closed (not unlinked) on drop.
#[derive(Debug)]
pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
}

// SAFETY: a named semaphore handle refers to a kernel-managed, process-shared
// object; sem_post/sem_wait/sem_timedwait are thread-safe.
unsafe impl Send for NamedSemaphore {}
// SAFETY: see above.
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Open the semaphore, creating it with count 0 when `create` is set.
    pub fn open(name: &str, create: bool) -> ShmResult<Self> {
        let c_name = c_name(name, "sem_open")?;

        // SAFETY: c_name is a valid NUL-terminated string; the variadic mode
        // and value arguments are only read when O_CREAT is given.
        let raw = unsafe {
            if create {
                libc::sem_open(
                    c_name.as_ptr(),
                    libc::O_CREAT,
                    OBJECT_MODE as libc::c_uint,
                    0 as libc::c_uint,
                )
            } else {
                libc::sem_open(c_name.as_ptr(), 0)
            }
        };

        if raw == libc::SEM_FAILED {
            return Err(ShmError::unavailable(
                name,
                "sem_open",
                io::Error::last_os_error(),
            ));
        }

        let sem = NonNull::new(raw).ok_or_else(|| {
            ShmError::unavailable(name, "sem_open", io::Error::other("null semaphore handle"))
        })?;

        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    /// Semaphore name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increment the count by one.
    pub fn post(&self) -> ShmResult<()> {
        // SAFETY: self.sem is a live handle returned by sem_open.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(self.semaphore_error("sem_post", io::Error::last_os_error()))
        }
    }

    /// Decrement the count, blocking while it is zero.
    ///
    /// `None` waits indefinitely. Returns `Ok(false)` when `timeout` expires.
    /// Signal interruptions are retried against the original deadline.
    pub fn wait(&self, timeout: Option<Duration>) -> ShmResult<bool> {
        let Some(timeout) = timeout else {
            loop {
                // SAFETY: self.sem is a live handle returned by sem_open.
                if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                    return Ok(true);
                }
                match Errno::last() {
                    Errno::EINTR => continue,
                    e => return Err(self.semaphore_error("sem_wait", e.into())),
                }
            }
        };

        // sem_timedwait takes an absolute CLOCK_REALTIME deadline.
        let now = clock_gettime(ClockId::CLOCK_REALTIME)
            .map_err(|e| self.semaphore_error("clock_gettime", e.into()))?;
        let deadline = now + TimeSpec::from(timeout);

        loop {
            // SAFETY: self.sem is live and deadline outlives the call.
            if unsafe { libc::sem_timedwait(self.sem.as_ptr(), deadline.as_ref()) } == 0 {
                return Ok(true);
            }
            match Errno::last() {
                Errno::EINTR => continue,
                Errno::ETIMEDOUT => return Ok(false),
                e => return Err(self.semaphore_error("sem_timedwait", e.into())),
            }
        }
    }

    /// Current count (frames signalled but not yet consumed).
    pub fn value(&self) -> ShmResult<i32> {
        let mut value: libc::c_int = 0;
        // SAFETY: self.sem is live; value is a valid out pointer.
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } == 0 {
            Ok(value)
        } else {
            Err(self.semaphore_error("sem_getvalue", io::Error::last_os_error()))
        }
    }

    fn semaphore_error(&self, operation: &'static str, source: io::Error) -> ShmError {
        ShmError::Semaphore {
            name: self.name.clone(),
            operation,
            source,
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: self.sem came from sem_open and is closed exactly once here.
        if unsafe { libc::sem_close(self.sem.as_ptr()) } != 0 {
            tracing::warn!(
                "sem_close failed for {}: {}",
                self.name,
                io::Error::last_os_error()
            );
        }
    }
}

/// Remove a semaphore name. Returns `false` if it did not exist.
pub fn unlink_semaphore(name: &str) -> ShmResult<bool> {
    let c_name = c_name(name, "sem_unlink")?;
    // SAFETY: c_name is a valid NUL-terminated string.
    if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
        return Ok(true);
    }
    match Errno::last() {
        Errno::ENOENT => Ok(false),
        e => Err(ShmError::unavailable(name, "sem_unlink", e)),
    }
}

fn c_name(name: &str, operation: &'static str) -> ShmResult<CString> {
    CString::new(name).map_err(|e| {
        ShmError::unavailable(name, operation, io::Error::new(io::ErrorKind::InvalidInput, e))
    })
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    nix::unistd::getpid().as_raw() as u32
}
