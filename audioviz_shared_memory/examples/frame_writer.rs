//! Producer example: publish a short sweep of spectra on the protocol channel

use audioviz_shared_memory::{FrameWriter, SHM_NAME, ShmResult, init_tracing};
use std::time::Duration;

fn main() -> ShmResult<()> {
    init_tracing();

    println!("Audioviz Frame Writer Example");
    println!("=============================");

    let mut writer = FrameWriter::init(SHM_NAME, true)?;
    println!("✓ Channel ready, next sequence {}", writer.next_sequence());

    let bins = 128usize;
    for step in 0..bins {
        let magnitude: Vec<f32> = (0..bins)
            .map(|i| if i == step { 1.0 } else { 0.1 })
            .collect();
        let sequence = writer.write(&magnitude, &[], 44_100, bins as u32)?;
        if sequence % 16 == 0 {
            println!("  wrote frame {sequence}");
        }
        std::thread::sleep(Duration::from_millis(23));
    }

    println!("\nDone. Run `audioviz unlink` to remove the channel.");
    Ok(())
}
