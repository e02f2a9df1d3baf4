//! Error types for ledger operations

use donation_core::{Money, PaymentError};
use thiserror::Error;

/// Errors raised by a [`LedgerStore`](crate::LedgerStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No transaction with this reference
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// No payout with this reference
    #[error("Payout not found: {0}")]
    PayoutNotFound(String),

    /// Reference already stored
    #[error("Duplicate reference: {0}")]
    Duplicate(String),

    /// Not enough available funds for a hold
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Money, available: Money },

    /// Amount currency differs from the account currency
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    /// Arithmetic would overflow or drive a balance negative
    #[error("Balance invariant violated: {0}")]
    InvariantViolation(String),

    /// Backend failure (connection, driver, timeout)
    #[error("Ledger backend error: {0}")]
    Backend(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for PaymentError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TransactionNotFound(r) => PaymentError::TransactionNotFound(r),
            LedgerError::PayoutNotFound(r) => PaymentError::PayoutNotFound(r),
            LedgerError::Duplicate(r) => PaymentError::DuplicateReference(r),
            LedgerError::InsufficientFunds {
                requested,
                available,
            } => PaymentError::InsufficientBalance {
                requested,
                available,
            },
            LedgerError::CurrencyMismatch(m) => PaymentError::Validation(m),
            other => PaymentError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donation_core::ErrorKind;

    #[test]
    fn test_conversion_to_payment_error() {
        let err: PaymentError = LedgerError::TransactionNotFound("ref".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: PaymentError = LedgerError::InsufficientFunds {
            requested: Money::ngn(200),
            available: Money::ngn(100),
        }
        .into();
        assert_eq!(err.status_code(), 403);

        let err: PaymentError = LedgerError::Backend("driver exploded".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
