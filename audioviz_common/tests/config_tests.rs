//! Configuration file tests: full file parsing, partial sections,
//! unknown-field rejection and semantic validation.

use audioviz_common::config::{AppConfig, ConfigError, ConfigLoader, LogLevel};
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("audioviz.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn full_config_is_parsed() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
log_level = "debug"
service_name = "renderer-01"

[channel]
segment_name = "/viz_stage"
write_semaphore = "/viz_stage_sem"
read_timeout_ms = 250
stats_interval = 500

[generator]
sample_rate = 48000
bin_count = 256
target_fps = 60
"#,
    );

    let config = AppConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.shared.service_name, "renderer-01");
    assert_eq!(config.channel.segment_name, "/viz_stage");
    assert_eq!(config.channel.write_semaphore, "/viz_stage_sem");
    assert_eq!(config.channel.read_timeout_ms, 250);
    assert_eq!(config.channel.stats_interval, 500);
    assert_eq!(config.generator.sample_rate, 48_000);
    assert_eq!(config.generator.bin_count, 256);
    assert_eq!(config.generator.target_fps, 60);
}

#[test]
fn partial_channel_section_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "analyzer"

[channel]
read_timeout_ms = 0
"#,
    );

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.channel.segment_name, "/audioviz_shm");
    assert_eq!(config.channel.write_semaphore, "/audioviz_sem_write");
    assert_eq!(config.channel.read_timeout_ms, 0);
}

#[test]
fn unknown_channel_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "renderer"

[channel]
read_semaphore = "/audioviz_sem_read"
"#,
    );

    assert!(matches!(
        AppConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn missing_shared_section_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[channel]\nread_timeout_ms = 10\n");

    assert!(matches!(
        AppConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn relative_segment_name_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "renderer"

[channel]
segment_name = "audioviz_shm"
"#,
    );

    let config = AppConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("segment_name")
    ));
}

#[test]
fn same_name_for_segment_and_semaphore_fails_validation() {
    let mut config = AppConfig::with_service_name("renderer");
    config.channel.write_semaphore = config.channel.segment_name.clone();
    assert!(config.validate().is_err());
}

#[test]
fn zero_fps_fails_validation() {
    let mut config = AppConfig::with_service_name("analyzer");
    config.generator.target_fps = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}
