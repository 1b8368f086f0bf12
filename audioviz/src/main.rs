//! # Audioviz Channel Tool
//!
//! Operator binary for the shared-memory frame channel between the audio
//! analyzer and the renderer.
//!
//! # Usage
//!
//! ```bash
//! # Feed the channel with a synthetic spectrum at 60 fps
//! audioviz generate --fps 60
//!
//! # Consume frames and print final statistics as JSON on Ctrl+C
//! audioviz --json monitor
//!
//! # Look at the ring without consuming anything
//! audioviz inspect --continuous --interval 0.5
//!
//! # Remove the kernel objects after both sides have exited
//! audioviz unlink
//! ```

#![deny(warnings)]

use audioviz::cli::{Args, Command, channel_names};
use audioviz::commands;
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("audioviz failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing comes up before the config is validated so that config errors
    // are logged; fall back to the default level if the file is unusable.
    let config = args.resolve_config();
    let configured = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, args.log_level(configured));
    let config = config?;

    info!(
        "Audioviz v{} ({}) starting",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let names = channel_names(&config);

    match &args.command {
        Command::Monitor { frames, .. } => {
            let stats = commands::monitor(&config.channel, *frames, &running)?;
            if args.json {
                println!("{}", stats.to_json()?);
            } else {
                info!("Final statistics: {}", stats);
            }
        }
        Command::Generate { frames, .. } => {
            commands::generate(&names, &config.generator, *frames, &running)?;
        }
        Command::Inspect {
            continuous,
            interval,
        } => {
            commands::inspect(&names, *continuous, *interval, args.json, &running)?;
        }
        Command::Unlink => {
            let report = commands::unlink(&names)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }

    info!("Audioviz shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
