//! Consumer example: read frames until the producer goes quiet

use audioviz_shared_memory::{FrameReader, SHM_NAME, ShmResult, init_tracing};

fn main() -> ShmResult<()> {
    init_tracing();

    println!("Audioviz Frame Reader Example");
    println!("=============================");

    let mut reader = match FrameReader::init(SHM_NAME, false) {
        Ok(r) => r,
        Err(e) => {
            println!("❌ Failed to attach: {}", e);
            println!("\nMake sure to run the writer example first:");
            println!("  cargo run --example frame_writer");
            return Err(e);
        }
    };

    loop {
        match reader.read_frame(2000) {
            Ok(Some(frame)) => {
                let peak = frame
                    .magnitudes()
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                println!("frame {:>5}  peak bin {:>3}", frame.header.frame_sequence(), peak);
            }
            Ok(None) => break,
            Err(e) if e.is_protocol_violation() => println!("⚠ {}", e),
            Err(e) => return Err(e),
        }
    }

    println!("\n{}", reader.stats());
    Ok(())
}
