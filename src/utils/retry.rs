//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter. The only retryable
//! failure in this crate is an optimistic-lock conflict: the booking changed
//! between read and write, and the operation re-runs against a fresh read.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::services::error::PaymentError;

/// Backoff for version-conflict retries on booking documents.
///
/// - Min delay: 10ms
/// - Max delay: 500ms
/// - Max attempts: 5
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(500))
        .with_max_times(5)
        .with_jitter()
}

/// Determines if a payment error is retryable (version conflict only).
///
/// Non-retryable: everything else. Processor rejections will never succeed
/// on a bare retry, and validation/precondition failures are final.
pub fn is_retryable(error: &PaymentError) -> bool {
    matches!(error, PaymentError::Conflict(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(is_retryable(&PaymentError::Conflict("booking b1".into())));
        assert!(!is_retryable(&PaymentError::Validation("bad".into())));
        assert!(!is_retryable(&PaymentError::AlreadyPaid("b1".into())));
    }
}
