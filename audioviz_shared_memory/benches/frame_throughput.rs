//! Frame write/read throughput benchmarks

use audioviz_shared_memory::{
    ChannelNames, Frame, FrameHeader, FrameReader, FrameWriter, SLOT_SIZE, unlink_channel,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_names(tag: &str) -> ChannelNames {
    let pid = std::process::id();
    let names = ChannelNames::new(
        format!("/avz_bench_{tag}_{pid}"),
        format!("/avz_bench_{tag}_{pid}_sem"),
    );
    let _ = unlink_channel(&names);
    names
}

/// Encode/decode cost of one slot, no shared memory involved
fn bench_frame_codec(c: &mut Criterion) {
    let magnitude = vec![0.5f32; 512];
    let phase = vec![1.0f32; 512];
    let frame = Frame::with_bins(FrameHeader::new(1, 0, 44_100, 512), &magnitude, &phase).unwrap();
    let mut bytes = Box::new([0u8; SLOT_SIZE]);

    c.bench_function("frame_encode", |b| {
        b.iter(|| frame.encode(black_box(&mut *bytes)));
    });

    frame.encode(&mut bytes);
    c.bench_function("frame_decode", |b| {
        b.iter(|| black_box(Frame::decode(black_box(&*bytes))));
    });
}

/// Writer alone: slot copy plus semaphore post
fn bench_write(c: &mut Criterion) {
    let names = bench_names("write");
    let mut writer = FrameWriter::init_with(&names, true).unwrap();
    let mut reader = FrameReader::init_with(&names, false).unwrap();
    let magnitude = vec![0.25f32; 512];

    c.bench_function("write_512_bins", |b| {
        b.iter(|| black_box(writer.write(&magnitude, &[], 44_100, 512).unwrap()));
    });

    // Keep the semaphore count from growing across runs.
    while reader.read_frame(1).unwrap().is_some() {}
    drop((writer, reader));
    unlink_channel(&names).unwrap();
}

/// Write followed by the matching read
fn bench_write_read_roundtrip(c: &mut Criterion) {
    let names = bench_names("roundtrip");
    let mut writer = FrameWriter::init_with(&names, true).unwrap();
    let mut reader = FrameReader::init_with(&names, false).unwrap();
    let magnitude = vec![0.75f32; 256];

    c.bench_function("roundtrip_256_bins", |b| {
        b.iter(|| {
            writer.write(&magnitude, &[], 44_100, 256).unwrap();
            let frame = reader.read_frame(1000).unwrap().unwrap();
            black_box(frame.header.frame_sequence());
        });
    });

    drop((writer, reader));
    unlink_channel(&names).unwrap();
}

criterion_group!(
    benches,
    bench_frame_codec,
    bench_write,
    bench_write_read_roundtrip
);
criterion_main!(benches);
