//! Subcommand implementations.
//!
//! Each loop polls a shared `running` flag between blocking calls so that a
//! Ctrl+C handler can stop it; the longest a loop can take to notice is one
//! read timeout or one inspect interval slice.

use crate::synth::TravellingPeak;
use audioviz_shared_memory::{
    ChannelNames, FrameReader, FrameWriter, ReaderStats, SegmentHandle, ShmResult, SlotSummary,
    UnlinkReport, snapshot, unlink_channel,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use viz::config::{ChannelConfig, GeneratorConfig};
use viz::consts::DEFAULT_READ_TIMEOUT_MS;

/// Sleep granularity while waiting for the next inspect dump.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Attach as the channel's reader and consume frames until stopped.
///
/// Stops when `running` is cleared or after `max_frames` frames. A configured
/// timeout of 0 would block shutdown indefinitely, so the monitor uses the
/// default timeout instead.
pub fn monitor(
    channel: &ChannelConfig,
    max_frames: Option<u64>,
    running: &AtomicBool,
) -> ShmResult<ReaderStats> {
    let names = ChannelNames::from(channel);
    let mut reader = FrameReader::init_with(&names, false)?;

    let timeout_ms = match channel.read_timeout_ms {
        0 => {
            debug!("read_timeout_ms = 0, using {} ms", DEFAULT_READ_TIMEOUT_MS);
            DEFAULT_READ_TIMEOUT_MS
        }
        ms => ms,
    };

    info!("Monitoring {} (timeout {} ms)", names.segment, timeout_ms);

    while running.load(Ordering::SeqCst) {
        match reader.read_frame(timeout_ms) {
            Ok(Some(frame)) => {
                let header = frame.header;
                debug!(
                    "Frame {} at {} us: {} bins @ {} Hz",
                    header.frame_sequence(),
                    header.timestamp_us(),
                    header.bin_count(),
                    header.sample_rate()
                );
            }
            Ok(None) => {
                debug!("No frame within {} ms", timeout_ms);
                continue;
            }
            Err(e) if e.is_protocol_violation() => {
                warn!("{}", e);
                continue;
            }
            Err(e) => return Err(e),
        }

        let frames_read = reader.frames_read();
        if channel.stats_interval > 0 && frames_read % channel.stats_interval == 0 {
            info!("{}", reader.stats());
        }
        if max_frames.is_some_and(|max| frames_read >= max) {
            break;
        }
    }

    let stats = reader.stats();
    reader.destroy();
    Ok(stats)
}

/// Create the channel and publish a travelling-peak spectrum at `target_fps`.
///
/// Returns the number of frames written.
pub fn generate(
    names: &ChannelNames,
    generator: &GeneratorConfig,
    max_frames: Option<u64>,
    running: &AtomicBool,
) -> ShmResult<u64> {
    let mut writer = FrameWriter::init_with(names, true)?;
    let mut synth = TravellingPeak::new(generator.bin_count as usize);
    let period = Duration::from_secs(1) / generator.target_fps.max(1);

    info!(
        "Generating {} bins @ {} Hz, {} fps on {}",
        generator.bin_count, generator.sample_rate, generator.target_fps, names.segment
    );

    let mut written = 0u64;
    let mut next_tick = Instant::now();

    while running.load(Ordering::SeqCst) && max_frames.is_none_or(|max| written < max) {
        let (magnitude, phase) = synth.next_frame();
        let sequence = writer.write(magnitude, phase, generator.sample_rate, generator.bin_count)?;
        written += 1;

        if sequence % u64::from(generator.target_fps.max(1)) == 0 {
            debug!("Published frame {}", sequence);
        }

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else {
            // Fell behind; restart the schedule instead of bursting.
            next_tick = now;
        }
    }

    writer.destroy();
    info!("Generator stopped after {} frames", written);
    Ok(written)
}

/// Summaries of every slot plus the pending signal count.
pub fn inspect_once(names: &ChannelNames) -> ShmResult<(Vec<SlotSummary>, i32)> {
    let channel = SegmentHandle::create_or_attach(names, false)?;
    let slots = snapshot(&channel);
    let pending = channel.pending()?;
    Ok((slots, pending))
}

/// Render an inspect dump as text or JSON.
pub fn render_inspection(
    names: &ChannelNames,
    slots: &[SlotSummary],
    pending: i32,
    json: bool,
) -> ShmResult<String> {
    if json {
        let report = serde_json::json!({
            "segment": names.segment,
            "write_semaphore": names.write_semaphore,
            "pending": pending,
            "slots": slots,
        });
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = format!(
        "{} (semaphore {}, pending {})\n",
        names.segment, names.write_semaphore, pending
    );
    for slot in slots {
        out.push_str(&slot.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Dump slot headers once, or every `interval` while `running` in continuous mode.
pub fn inspect(
    names: &ChannelNames,
    continuous: bool,
    interval: Duration,
    json: bool,
    running: &AtomicBool,
) -> ShmResult<()> {
    loop {
        let (slots, pending) = inspect_once(names)?;
        println!("{}", render_inspection(names, &slots, pending, json)?);

        if !continuous {
            return Ok(());
        }

        let resume = Instant::now() + interval;
        while Instant::now() < resume {
            if !running.load(Ordering::SeqCst) {
                return Ok(());
            }
            std::thread::sleep(POLL_SLICE.min(resume.saturating_duration_since(Instant::now())));
        }
    }
}

/// Remove the channel's kernel objects.
pub fn unlink(names: &ChannelNames) -> ShmResult<UnlinkReport> {
    let report = unlink_channel(names)?;
    if !report.any_removed() {
        warn!("Nothing to remove for {} / {}", names.segment, names.write_semaphore);
    }
    Ok(report)
}
