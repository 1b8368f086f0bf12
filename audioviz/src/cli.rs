//! Command-line arguments and configuration resolution.

use audioviz_shared_memory::ChannelNames;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use viz::config::{AppConfig, ConfigError, ConfigLoader, LogLevel};

/// Service name used when no configuration file is given.
pub const DEFAULT_SERVICE_NAME: &str = "audioviz";

/// Audioviz channel tool
#[derive(Parser, Debug)]
#[command(name = "audioviz")]
#[command(version)]
#[command(about = "Monitor, feed, inspect or remove the audioviz shared-memory frame channel")]
#[command(long_about = None)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Shared segment name (overrides config)
    #[arg(long, value_name = "NAME", global = true)]
    pub segment: Option<String>,

    /// Write semaphore name (overrides config)
    #[arg(long, value_name = "NAME", global = true)]
    pub semaphore: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output logs and reports in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Attach as the reader and report frame statistics until Ctrl+C
    Monitor {
        /// Wait per read in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u32>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Create the channel and publish synthetic spectra
    Generate {
        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Bins per frame (at most 512)
        #[arg(long)]
        bins: Option<u32>,

        /// Sample rate stamped into each header
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Dump the header of every slot
    Inspect {
        /// Keep dumping until Ctrl+C
        #[arg(long)]
        continuous: bool,

        /// Seconds between dumps in continuous mode
        #[arg(long, value_name = "SECONDS", default_value = "1", value_parser = parse_seconds)]
        interval: Duration,
    },

    /// Remove the segment and semaphore names
    Unlink,
}

impl Args {
    /// Load the configuration file (or defaults) and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::with_service_name(DEFAULT_SERVICE_NAME),
        };

        if let Some(segment) = &self.segment {
            config.channel.segment_name = segment.clone();
        }
        if let Some(semaphore) = &self.semaphore {
            config.channel.write_semaphore = semaphore.clone();
        }

        match &self.command {
            Command::Monitor {
                timeout_ms: Some(timeout_ms),
                ..
            } => config.channel.read_timeout_ms = *timeout_ms,
            Command::Generate {
                fps,
                bins,
                sample_rate,
                ..
            } => {
                if let Some(fps) = fps {
                    config.generator.target_fps = *fps;
                }
                if let Some(bins) = bins {
                    config.generator.bin_count = *bins;
                }
                if let Some(sample_rate) = sample_rate {
                    config.generator.sample_rate = *sample_rate;
                }
            }
            _ => {}
        }

        config.validate()?;
        Ok(config)
    }

    /// Tracing level: `--verbose` wins over the configured level.
    pub fn log_level(&self, configured: LogLevel) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            to_level(configured)
        }
    }
}

/// Channel names from a resolved configuration.
pub fn channel_names(config: &AppConfig) -> ChannelNames {
    ChannelNames::from(&config.channel)
}

/// Map a configured log level onto a tracing level.
pub fn to_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|e| format!("invalid number of seconds {value:?}: {e}"))?;
    if seconds <= 0.0 {
        return Err(format!("interval must be positive, got {seconds}"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_accepts_fractions() {
        assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn level_mapping() {
        assert_eq!(to_level(LogLevel::Warn), Level::WARN);
        assert_eq!(to_level(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn args_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
