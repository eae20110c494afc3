//! Retry policy for idempotent store calls.
//!
//! Built on `reqwest-retry`: an exponential backoff with fixed bounds and no
//! jitter, so the delay between attempts grows monotonically, plus a strategy
//! deciding which outcomes are worth another attempt.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{
    default_on_request_failure, Jitter, Retryable, RetryableStrategy, RetryTransientMiddleware,
};

use crate::configs::RetryConfig;

/// Backoff schedule for the given bounds.
pub fn backoff_policy(config: &RetryConfig) -> ExponentialBackoff {
    let min = Duration::from_millis(config.min_backoff_ms);
    let max = Duration::from_millis(config.max_backoff_ms.max(config.min_backoff_ms));
    ExponentialBackoff::builder()
        .retry_bounds(min, max)
        .jitter(Jitter::None)
        .base(2)
        .build_with_max_retries(config.max_retries)
}

/// Classifies store replies.
///
/// Network failures, 408, 429 and every 5xx are transient. Any other 4xx is
/// final: the backend has looked at the request and refused it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreRetryStrategy;

impl RetryableStrategy for StoreRetryStrategy {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(response) => {
                let decision = classify_status(response.status());
                if decision == Some(Retryable::Transient) {
                    tracing::warn!(
                        status = response.status().as_u16(),
                        url = %response.url(),
                        "transient backend status, backing off"
                    );
                }
                decision
            }
            Err(err) => {
                let decision = default_on_request_failure(err);
                if decision == Some(Retryable::Transient) {
                    tracing::warn!(error = %err, "network failure, backing off");
                }
                decision
            }
        }
    }
}

/// `None` means success: hand the response to the caller.
pub fn classify_status(status: StatusCode) -> Option<Retryable> {
    if status.is_success() {
        None
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        Some(Retryable::Transient)
    } else {
        Some(Retryable::Fatal)
    }
}

/// Middleware layer applying [`backoff_policy`] with [`StoreRetryStrategy`].
pub fn retry_middleware(
    config: &RetryConfig,
) -> RetryTransientMiddleware<ExponentialBackoff, StoreRetryStrategy> {
    RetryTransientMiddleware::new_with_policy_and_strategy(
        backoff_policy(config),
        StoreRetryStrategy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(Retryable::Transient)
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(Retryable::Transient)
        );
        assert_eq!(
            classify_status(StatusCode::REQUEST_TIMEOUT),
            Some(Retryable::Transient)
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), Some(Retryable::Fatal));
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), Some(Retryable::Fatal));
        assert_eq!(
            classify_status(StatusCode::PAYMENT_REQUIRED),
            Some(Retryable::Fatal)
        );
    }
}
