//! Cross-process tests.
//!
//! Uses `fork()` so producer and consumer live in separate address spaces:
//! - Parent creates the channel and reads
//! - Child attaches as the writer and publishes frames
//! - Parent checks order and statistics, then the child's exit status

mod common;

use audioviz_shared_memory::{FrameReader, FrameWriter};
use common::TestChannel;
use std::time::Duration;

const FRAMES: u64 = 20;

#[test]
fn child_writer_parent_reader() {
    let channel = TestChannel::new("xproc");
    let mut reader = FrameReader::init_with(&channel.names, true).expect("parent: create channel");

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };

    if pid == 0 {
        // ── CHILD PROCESS (writer) ──
        let code = match FrameWriter::init_with(&channel.names, false) {
            Ok(mut writer) => {
                let mut code = 0;
                for i in 0..FRAMES {
                    let level = i as f32 / FRAMES as f32;
                    if writer.write(&[level; 256], &[], 44_100, 256).is_err() {
                        code = 2;
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(2));
                }
                code
            }
            Err(_) => 1,
        };
        // Skip destructors inherited from the parent (the channel guard).
        unsafe { libc::_exit(code) };
    }

    // ── PARENT PROCESS (reader) ──
    assert!(pid > 0, "fork failed");

    let mut sequences = Vec::new();
    while let Some(frame) = reader.read_frame(1000).expect("parent: read") {
        let sequence = frame.header.frame_sequence();
        let expected_level = (sequence - 1) as f32 / FRAMES as f32;
        assert_eq!(frame.magnitude[0], expected_level);
        assert_eq!(frame.header.bin_count(), 256);
        sequences.push(sequence);
        if sequence == FRAMES {
            break;
        }
    }

    let mut status: libc::c_int = 0;
    unsafe {
        libc::waitpid(pid, &mut status, 0);
    }
    assert!(libc::WIFEXITED(status), "child did not exit normally");
    assert_eq!(libc::WEXITSTATUS(status), 0, "child writer failed");

    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(reader.last_sequence(), FRAMES);
    assert_eq!(reader.frames_read() + reader.frames_dropped(), FRAMES);
}
