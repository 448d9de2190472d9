//! Error taxonomy for payment operations.

use crate::fees::FeeError;
use crate::interfaces::bookings::StorageError;
use crate::interfaces::processor::ProcessorError;

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors surfaced by the payment services.
///
/// Validation and not-found reject before any side effect. Conflicts are
/// retryable against a fresh read. Processor failures carry the API's own
/// status and message for diagnostics and are never retried here.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("contractor {0} has no payout account on file")]
    NoPayoutAccount(String),

    /// Capture preconditions unmet; `detail` names the blocking state.
    #[error("not ready for capture: {detail}")]
    NotReady { detail: String },

    /// The booking's funds were already captured.
    #[error("booking {0} is already paid")]
    AlreadyPaid(String),

    #[error(transparent)]
    Computation(#[from] FeeError),

    /// A concurrent writer got there first; retry against a fresh read.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    #[error(transparent)]
    Processor(ProcessorError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for PaymentError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { kind, id } => PaymentError::NotFound { kind, id },
            StorageError::VersionConflict { id, attempted } => PaymentError::Conflict(format!(
                "{id} changed concurrently (wrote against version {attempted})"
            )),
            other => PaymentError::Storage(other),
        }
    }
}

impl From<ProcessorError> for PaymentError {
    fn from(error: ProcessorError) -> Self {
        match error {
            ProcessorError::Missing(id) => PaymentError::NotFound {
                kind: "processor object",
                id,
            },
            other => PaymentError::Processor(other),
        }
    }
}
