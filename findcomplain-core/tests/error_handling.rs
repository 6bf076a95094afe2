use findcomplain_core::{
    ApiError, ConfigError, CoreError, ErrorExt, ErrorReporter, FailureKind,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let api_error = CoreError::Api(ApiError::RequestTimeout);
    assert_eq!(api_error.error_code(), "API");

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "poll_interval_ms".to_string(),
        value: "0".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let cancelled = CoreError::Cancelled {
        operation: "Polling session 3".to_string(),
    };
    assert_eq!(cancelled.error_code(), "CANCELLED");

    let server_error = ApiError::ServerError {
        status_code: 503,
        endpoint: "/analyze/1/status".to_string(),
    };
    assert_eq!(server_error.error_code(), "API_SERVER_ERROR");
}

#[test]
fn test_retryable_errors() {
    let server_error = CoreError::Api(ApiError::ServerError {
        status_code: 502,
        endpoint: "/analyze/1/status".to_string(),
    });
    assert!(server_error.is_retryable());

    let not_found = CoreError::Api(ApiError::NotFound {
        resource: "/analyze/99/status".to_string(),
    });
    assert!(!not_found.is_retryable());

    let invalid = CoreError::invalid_input("subreddit must not be empty");
    assert!(!invalid.is_retryable());
}

#[test]
fn test_retry_after() {
    let server_error = CoreError::Api(ApiError::ServerError {
        status_code: 503,
        endpoint: "/analyze/1/status".to_string(),
    });
    assert_eq!(server_error.retry_after(), Some(Duration::from_secs(2)));

    let bad_request = CoreError::Api(ApiError::BadRequest {
        endpoint: "/analyze".to_string(),
        details: "Subreddit is required".to_string(),
    });
    assert_eq!(bad_request.retry_after(), None);
}

#[test]
fn test_failure_kinds() {
    let timeout = CoreError::Api(ApiError::RequestTimeout);
    assert_eq!(timeout.failure_kind(), FailureKind::NetworkFailure);

    let status = CoreError::Api(ApiError::UnexpectedStatus {
        status_code: 409,
        endpoint: "/analyze".to_string(),
    });
    assert_eq!(status.failure_kind(), FailureKind::ServerError);

    let invalid = CoreError::invalid_input("post limit must be one of 25, 50 or 100");
    assert_eq!(invalid.failure_kind(), FailureKind::InvalidRequest);

    let io = CoreError::from(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "config.toml",
    ));
    assert_eq!(io.failure_kind(), FailureKind::Internal);
    assert_eq!(io.error_code(), "IO");
}

#[test]
fn test_user_friendly_messages() {
    let api_error = CoreError::Api(ApiError::RequestTimeout);
    let message = api_error.user_friendly_message();
    assert!(message.contains("timed out"));

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "request_timeout_secs".to_string(),
        value: "0".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("request_timeout_secs"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::Api(ApiError::RequestTimeout);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
