//! Property tests for delivery order and drop accounting

mod common;

use audioviz_shared_memory::{FrameReader, FrameWriter};
use common::TestChannel;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

/// One step of an interleaved producer/consumer schedule.
#[derive(Debug, Clone, Copy)]
enum Step {
    Write(u8),
    Read(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![(1u8..=20).prop_map(Step::Write), (1u8..=12).prop_map(Step::Read)]
}

fn fail(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Sequences only move forward and every produced frame is either read or dropped
    #[test]
    fn reads_are_ordered_and_accounted(schedule in prop::collection::vec(step(), 1..24)) {
        let channel = TestChannel::new("prop_order");
        let mut writer = FrameWriter::init_with(&channel.names, true).map_err(fail)?;
        let mut reader = FrameReader::init_with(&channel.names, false).map_err(fail)?;

        let mut written = 0u64;
        let mut previous = 0u64;

        for step in schedule {
            match step {
                Step::Write(n) => {
                    for _ in 0..n {
                        written = writer.write(&[0.5; 16], &[], 44_100, 16).map_err(fail)?;
                    }
                }
                Step::Read(n) => {
                    for _ in 0..n {
                        let Some(frame) = reader.read_frame(1).map_err(fail)? else {
                            break;
                        };
                        let sequence = frame.header.frame_sequence();
                        prop_assert!(sequence > previous);
                        prop_assert!(sequence <= written);
                        previous = sequence;
                    }
                }
            }
            prop_assert_eq!(
                reader.frames_read() + reader.frames_dropped(),
                reader.last_sequence()
            );
        }

        // Draining always reaches the newest frame.
        while reader.read_frame(5).map_err(fail)?.is_some() {}
        prop_assert_eq!(reader.last_sequence(), written);
        prop_assert!(reader.frames_dropped() <= written.saturating_sub(8));
    }
}
