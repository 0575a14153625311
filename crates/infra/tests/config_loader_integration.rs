//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading retry settings from files.

use std::io::Write;
use std::time::Duration;

use reattempt_common::CommonError;
use reattempt_infra::config::{self, BackoffKind};
use tempfile::{Builder, NamedTempFile};

fn settings_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .prefix("reattempt")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_settings_from_json_file() {
    let json_content = r#"{
        "max_attempts": 5,
        "base_delay_ms": 500,
        "max_delay_ms": 8000,
        "respect_retry_after": true,
        "backoff": "exponential",
        "multiplier": 2.5
    }"#;
    let file = settings_file(".json", json_content);

    let settings =
        config::load_from_file(Some(file.path().to_path_buf())).expect("load JSON settings");

    assert_eq!(settings.max_attempts, 5);
    assert_eq!(settings.base_delay, Duration::from_millis(500));
    assert_eq!(settings.max_delay, Duration::from_secs(8));
    assert!(settings.respect_retry_after);
    assert_eq!(settings.backoff, BackoffKind::Exponential);
    assert!((settings.multiplier - 2.5).abs() < f64::EPSILON);
}

#[test]
fn test_load_settings_from_toml_file() {
    let toml_content = r#"
max_attempts = 2
base_delay_ms = 1000
respect_retry_after = false
backoff = "fixed"
"#;
    let file = settings_file(".toml", toml_content);

    let settings =
        config::load_from_file(Some(file.path().to_path_buf())).expect("load TOML settings");

    assert_eq!(settings.max_attempts, 2);
    assert_eq!(settings.base_delay, Duration::from_secs(1));
    assert!(!settings.respect_retry_after);
    assert_eq!(settings.backoff, BackoffKind::Fixed);
}

/// Validates `load_from_file` behavior for the invalid settings scenario.
///
/// Assertions:
/// - Confirms malformed TOML is reported as a config error
/// - Confirms out-of-range values fail validation
/// - Confirms unknown extensions are rejected
#[test]
fn test_load_settings_rejects_invalid_files() {
    let malformed = settings_file(".toml", "max_attempts = [");
    let err = config::load_from_file(Some(malformed.path().to_path_buf()))
        .expect_err("malformed TOML");
    assert!(matches!(err, CommonError::Config { .. }));

    let inverted = settings_file(".json", r#"{"base_delay_ms": 5000, "max_delay_ms": 10}"#);
    let err =
        config::load_from_file(Some(inverted.path().to_path_buf())).expect_err("invalid range");
    assert!(err.to_string().contains("exceeds max delay"), "unexpected error: {err}");

    let yaml = settings_file(".yaml", "max_attempts: 3");
    let err = config::load_from_file(Some(yaml.path().to_path_buf())).expect_err("yaml");
    assert!(err.to_string().contains("Unsupported config format"));
}

#[test]
fn test_loaded_settings_build_policy() {
    let file = settings_file(".toml", "max_attempts = 3\nbase_delay_ms = 10\n");
    let settings = config::load_from_file(Some(file.path().to_path_buf())).expect("load");

    let policy = settings
        .into_policy::<reattempt_infra::HttpResponse, reattempt_infra::HttpError>()
        .expect("policy");
    assert_eq!(policy.name(), "fixed");
}
