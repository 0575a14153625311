//! Integration tests for `reattempt_common::error`.
//!
//! These suites validate classification and module error delegation so the
//! retry policies downstream see consistent failure semantics.

use std::time::Duration;

use reattempt_common::error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
use reattempt_common::impl_error_classification;
use thiserror::Error;

/// Validates that `CommonError` classification surfaces the expected retryable
/// and severity combinations for each variant.
#[test]
fn classification_matrix_matches_expected_contract() {
    let cases = vec![
        (CommonError::config("max_attempts missing"), false, ErrorSeverity::Error),
        (CommonError::config_field("backoff", "unknown"), false, ErrorSeverity::Error),
        (CommonError::timeout("send", Duration::from_secs(3)), true, ErrorSeverity::Warning),
        (
            CommonError::internal_with_context("broken", "scheduler"),
            false,
            ErrorSeverity::Critical,
        ),
    ];

    for (err, retryable, severity) in cases {
        assert_eq!(err.is_retryable(), retryable, "retryable mismatch for {err}");
        assert_eq!(err.severity(), severity, "severity mismatch for {err}");
    }
}

#[derive(Debug, Error)]
enum TransportFault {
    #[error("server busy")]
    Busy,

    #[error("request rejected")]
    Rejected,

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(TransportFault, Common,
    Self::Busy => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Rejected => {
        retryable: false,
        severity: ErrorSeverity::Error,
    }
);

fn load_setting(raw: &str) -> CommonResult<u32> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CommonError::config(format!("Invalid JSON format: {e}")))?;
    value
        .get("max_attempts")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| CommonError::config_field("max_attempts", "missing or out of range"))
}

/// Validates that module errors built with the macro delegate to
/// `CommonError`.
///
/// Assertions:
/// - Confirms `Busy` is retryable and `Rejected` is final.
/// - Confirms an embedded timeout keeps its classification.
#[test]
fn module_error_macro_delegates_classification() {
    assert!(TransportFault::Busy.is_retryable());
    assert!(!TransportFault::Rejected.is_retryable());
    assert_eq!(TransportFault::Rejected.severity(), ErrorSeverity::Error);

    let timed_out: TransportFault =
        CommonError::timeout("read", Duration::from_millis(750)).into();
    assert!(timed_out.is_retryable());
    assert_eq!(timed_out.severity(), ErrorSeverity::Warning);
}

/// Validates `?` propagation through `CommonResult`.
#[test]
fn common_result_propagates_parse_and_config_errors() {
    assert_eq!(load_setting(r#"{"max_attempts": 5}"#).unwrap(), 5);

    let missing = load_setting("{}").unwrap_err();
    assert!(missing.to_string().contains("max_attempts"));

    let malformed = load_setting("not json").unwrap_err();
    assert!(matches!(malformed, CommonError::Config { field: None, .. }));
}
