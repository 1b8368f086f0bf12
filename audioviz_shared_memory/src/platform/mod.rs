//! Platform-specific primitives: POSIX shm objects and named semaphores.

#[cfg(not(target_os = "linux"))]
compile_error!("audioviz_shared_memory requires Linux (sem_timedwait, /dev/shm)");

pub mod linux;

pub use linux::{
    NamedSemaphore, get_current_pid, map_segment, open_segment, unlink_segment, unlink_semaphore,
};
