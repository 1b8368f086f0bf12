//! Configuration loading traits and types.
//!
//! Producers and consumers share one TOML file describing the channel they
//! meet on. Every section except `[shared]` is optional and falls back to the
//! protocol defaults.
//!
//! # Usage
//!
//! ```rust,no_run
//! use audioviz_common::config::{AppConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AppConfig::load(Path::new("audioviz.toml"))?;
//!     config.validate()?;
//!     println!("Segment: {}", config.channel.segment_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SAMPLE_RATE, DEFAULT_TARGET_FPS, MAX_FFT_BINS,
    SEM_WRITE_NAME, SHM_NAME,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across audioviz processes.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "renderer-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Names and timing of the channel both processes attach to.
///
/// # TOML Example
///
/// ```toml
/// [channel]
/// segment_name = "/audioviz_shm"
/// write_semaphore = "/audioviz_sem_write"
/// read_timeout_ms = 100
/// stats_interval = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// POSIX name of the shared segment.
    pub segment_name: String,
    /// POSIX name of the write-availability semaphore.
    pub write_semaphore: String,
    /// Reader wait per `read_frame` call; 0 waits indefinitely.
    pub read_timeout_ms: u32,
    /// Log reader statistics every N frames read; 0 disables.
    pub stats_interval: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            segment_name: SHM_NAME.to_string(),
            write_semaphore: SEM_WRITE_NAME.to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            stats_interval: 100,
        }
    }
}

impl ChannelConfig {
    /// Validate both object names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_posix_name("segment_name", &self.segment_name)?;
        validate_posix_name("write_semaphore", &self.write_semaphore)?;
        if self.segment_name == self.write_semaphore {
            return Err(ConfigError::ValidationError(
                "segment_name and write_semaphore must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the synthetic spectrum producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Sample rate stamped into every frame header.
    pub sample_rate: u32,
    /// Bins per frame.
    pub bin_count: u32,
    /// Frames per second.
    pub target_fps: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bin_count: MAX_FFT_BINS as u32,
            target_fps: DEFAULT_TARGET_FPS,
        }
    }
}

impl GeneratorConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_count as usize > MAX_FFT_BINS {
            return Err(ConfigError::ValidationError(format!(
                "bin_count {} exceeds {MAX_FFT_BINS}",
                self.bin_count
            )));
        }
        if self.target_fps == 0 {
            return Err(ConfigError::ValidationError(
                "target_fps must be greater than 0".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ValidationError(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process-wide settings.
    pub shared: SharedConfig,
    /// Channel names and reader timing.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Synthetic producer settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl AppConfig {
    /// Configuration used when no file is given.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: service_name.into(),
            },
            channel: ChannelConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.channel.validate()?;
        self.generator.validate()
    }
}

/// Check a POSIX IPC object name: leading `/`, no further `/`, no NUL, <= 255 bytes.
pub fn validate_posix_name(field: &str, name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| {
        Err(ConfigError::ValidationError(format!(
            "{field} {name:?}: {reason}"
        )))
    };

    if !name.starts_with('/') {
        return invalid("must start with '/'");
    }
    if name.len() < 2 {
        return invalid("must have at least one character after '/'");
    }
    if name[1..].contains('/') {
        return invalid("must not contain '/' after the first character");
    }
    if name.contains('\0') {
        return invalid("must not contain NUL");
    }
    if name.len() > 255 {
        return invalid("must be at most 255 bytes");
    }
    Ok(())
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
