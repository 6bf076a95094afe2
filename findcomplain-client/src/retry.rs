use findcomplain_core::{ApiError, ClientConfig, CoreError};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of consecutive retries before giving up
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Retry policy for status polls. The first retry waits one poll interval.
    pub fn polling(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_poll_retries,
            base_delay_ms: config.poll_interval_ms,
            max_delay_ms: 30000.max(config.poll_interval_ms),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Don't retry (for permanent failures)
    NoRetry,
}

/// Determine retry strategy based on error type
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::Api(api_error) => match api_error {
            // Server errors are usually transient
            ApiError::ServerError { .. } => RetryStrategy::Retry,
            ApiError::RequestTimeout => RetryStrategy::Retry,
            // The backend answered deliberately; asking again changes nothing
            ApiError::BadRequest { .. } => RetryStrategy::NoRetry,
            ApiError::NotFound { .. } => RetryStrategy::NoRetry,
            ApiError::UnexpectedStatus { .. } => RetryStrategy::NoRetry,
            ApiError::InvalidResponse { .. } => RetryStrategy::NoRetry,
        },
        // Network errors might be transient
        CoreError::Network(reqwest_error) => {
            if reqwest_error.is_timeout()
                || reqwest_error.is_connect()
                || reqwest_error.is_request()
            {
                RetryStrategy::Retry
            } else {
                RetryStrategy::NoRetry
            }
        }
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    // Add jitter to prevent thundering herd
    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

/// Tracks consecutive failures of one polling schedule.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    config: RetryConfig,
    consecutive_failures: u32,
}

impl RetryBudget {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Returns the delay before the next attempt, or `None` when the error is
    /// permanent or the budget is spent.
    pub fn next_delay(&mut self, error: &CoreError) -> Option<Duration> {
        if get_retry_strategy(error) == RetryStrategy::NoRetry {
            return None;
        }
        if self.consecutive_failures >= self.config.max_retries {
            return None;
        }
        let delay = calculate_delay(self.consecutive_failures, &self.config);
        self.consecutive_failures += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
