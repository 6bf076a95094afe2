use crate::error::*;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Coarse failure classes shown to the user. An empty result set is not a
/// failure and never maps here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request never produced a response.
    NetworkFailure,
    /// The backend answered with a non-2xx status or an unusable body.
    ServerError,
    /// The request was rejected before or by the backend as malformed.
    InvalidRequest,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NetworkFailure => "network failure",
            FailureKind::ServerError => "server error",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::Internal => "internal error",
        };
        f.write_str(label)
    }
}

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
    fn failure_kind(&self) -> FailureKind;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Api(e) => {
                error!("API error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Api(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Api(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Api(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Could not reach the analysis server. Please check that it is running.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            CoreError::Cancelled { operation } => format!("{} was cancelled.", operation),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Api(_) => "API".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Cancelled { .. } => "CANCELLED".to_string(),
        }
    }

    fn failure_kind(&self) -> FailureKind {
        match self {
            CoreError::Api(e) => e.failure_kind(),
            CoreError::Network(_) => FailureKind::NetworkFailure,
            CoreError::Serialization(_) => FailureKind::ServerError,
            CoreError::InvalidInput { .. } | CoreError::Config(_) => FailureKind::InvalidRequest,
            CoreError::NotFound { .. } => FailureKind::ServerError,
            _ => FailureKind::Internal,
        }
    }
}

impl ErrorExt for ApiError {
    fn log_error(&self) -> &Self {
        error!("ApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::ServerError { .. } | ApiError::RequestTimeout
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(2))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ApiError::BadRequest { details, .. } => {
                format!("The server rejected the request: {}", details)
            }
            ApiError::NotFound { resource } => {
                format!("'{}' was not found on the server.", resource)
            }
            ApiError::UnexpectedStatus { status_code, .. } => {
                format!("The server answered with status {}.", status_code)
            }
            ApiError::ServerError { .. } => {
                "The analysis server ran into an error. Please try again later.".to_string()
            }
            ApiError::RequestTimeout => {
                "The request to the analysis server timed out. Please try again.".to_string()
            }
            ApiError::InvalidResponse { .. } => {
                "The server sent a response that could not be read.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ApiError::BadRequest { .. } => "API_BAD_REQUEST".to_string(),
            ApiError::NotFound { .. } => "API_NOT_FOUND".to_string(),
            ApiError::UnexpectedStatus { .. } => "API_UNEXPECTED_STATUS".to_string(),
            ApiError::ServerError { .. } => "API_SERVER_ERROR".to_string(),
            ApiError::RequestTimeout => "API_TIMEOUT".to_string(),
            ApiError::InvalidResponse { .. } => "API_INVALID_RESPONSE".to_string(),
        }
    }

    fn failure_kind(&self) -> FailureKind {
        match self {
            ApiError::RequestTimeout => FailureKind::NetworkFailure,
            ApiError::BadRequest { .. } => FailureKind::InvalidRequest,
            _ => FailureKind::ServerError,
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::InvalidUrl { url, .. } => {
                format!("'{}' is not a usable backend URL.", url)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::InvalidUrl { .. } => "CONFIG_INVALID_URL".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }

    fn failure_kind(&self) -> FailureKind {
        FailureKind::InvalidRequest
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("Failure kind: {}", error.failure_kind());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
