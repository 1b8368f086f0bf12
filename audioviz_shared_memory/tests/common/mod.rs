//! Shared helpers for integration tests.

#![allow(dead_code)]

use audioviz_shared_memory::{ChannelNames, unlink_channel};

/// Channel with names unique to this process, unlinked on drop.
pub struct TestChannel {
    pub names: ChannelNames,
}

impl TestChannel {
    pub fn new(tag: &str) -> Self {
        let pid = std::process::id();
        let names = ChannelNames::new(
            format!("/avz_test_{tag}_{pid}"),
            format!("/avz_test_{tag}_{pid}_sem"),
        );
        let _ = unlink_channel(&names);
        Self { names }
    }
}

impl Drop for TestChannel {
    fn drop(&mut self) {
        let _ = unlink_channel(&self.names);
    }
}

/// Magnitudes with a single bin set.
pub fn single_bin(bin_count: usize, index: usize, value: f32) -> Vec<f32> {
    let mut magnitude = vec![0.0; bin_count];
    magnitude[index] = value;
    magnitude
}
