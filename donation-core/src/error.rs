//! Error types for payment processing

use crate::money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amount is zero, negative or too large
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// User has no bank account on file
    #[error("Bank account not registered for user: {0}")]
    BankNotRegistered(String),

    /// Bank name is not in the gateway's bank list
    #[error("Bank not supported: {0}")]
    BankNotFound(String),

    /// No transaction with this reference
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// No payout with this reference
    #[error("Payout not found: {0}")]
    PayoutNotFound(String),

    /// Withdrawal larger than the available balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Money, available: Money },

    /// Reference already used
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),

    /// State transition not allowed from the current state
    #[error("Invalid state transition for {reference}: {from} -> {to}")]
    InvalidTransition {
        reference: String,
        from: String,
        to: String,
    },

    /// Invalid webhook signature
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// Signature header absent
    #[error("Webhook signature missing")]
    WebhookSignatureMissing,

    /// Provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream call exceeded its deadline
    #[error("Gateway request timed out")]
    Timeout,

    /// Rate limited
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u32),

    /// Gateway answered with a body we could not decode
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Transfer recipient could not be created or is inactive
    #[error("Transfer recipient creation failed: {0}")]
    RecipientCreationFailed(String),

    /// Transfer rejected or failed at the gateway
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Transfer call ended without an answer; it may still have been issued
    #[error("Transfer {reference} outcome unknown: {message}")]
    TransferUnconfirmed { reference: String, message: String },

    /// Checkout opened at the gateway but its pending transaction was not stored
    #[error("Checkout {reference} opened but not recorded: {message}")]
    CheckoutNotRecorded { reference: String, message: String },

    /// Money moved at the gateway but the ledger does not reflect it
    #[error("Reconciliation required for {reference}: {message}")]
    Reconciliation { reference: String, message: String },

    /// Authentication error
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::Timeout
        } else if err.is_decode() {
            PaymentError::MalformedResponse(err.to_string())
        } else {
            PaymentError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::MalformedResponse(err.to_string())
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Stable, caller-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Gateway,
    Signature,
    Reconciliation,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in responses and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found_error",
            Self::Conflict => "conflict_error",
            Self::Gateway => "gateway_error",
            Self::Signature => "signature_error",
            Self::Reconciliation => "reconciliation_error",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PaymentError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidAmount(_) => ErrorKind::Validation,
            Self::UserNotFound(_)
            | Self::BankNotRegistered(_)
            | Self::BankNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::PayoutNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientBalance { .. }
            | Self::DuplicateReference(_)
            | Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::InvalidWebhookSignature | Self::WebhookSignatureMissing => ErrorKind::Signature,
            Self::Provider(_)
            | Self::Network(_)
            | Self::Timeout
            | Self::RateLimited(_)
            | Self::MalformedResponse(_)
            | Self::RecipientCreationFailed(_)
            | Self::TransferFailed(_)
            | Self::TransferUnconfirmed { .. } => ErrorKind::Gateway,
            Self::Reconciliation { .. } => ErrorKind::Reconciliation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Storage(_)
            | Self::CheckoutNotRecorded { .. }
            | Self::Config(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            // Withdrawals beyond the balance are forbidden rather than conflicting.
            Self::InsufficientBalance { .. } => 403,
            Self::RateLimited(_) => 429,
            Self::Timeout | Self::TransferUnconfirmed { .. } => 504,
            Self::CheckoutNotRecorded { .. } => 503,
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::Signature => 400,
                ErrorKind::NotFound => 404,
                ErrorKind::Conflict => 409,
                ErrorKind::Gateway => 502,
                ErrorKind::Unauthorized => 401,
                ErrorKind::Reconciliation | ErrorKind::Internal => 500,
            },
        }
    }

    /// Whether the caller may safely retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Gateway) || matches!(self, Self::CheckoutNotRecorded { .. })
    }

    /// Whether this error is a transient transport problem worth an automatic retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited(_)
        )
    }

    /// Message safe to show to end users
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal if self.is_retryable() => {
                "We could not start your payment. Please try again.".into()
            }
            ErrorKind::Internal => "An internal error occurred. Please try again later.".into(),
            ErrorKind::Reconciliation => {
                "Your request was processed by the bank but could not be recorded. \
                 It has been flagged for manual review."
                    .into()
            }
            ErrorKind::Gateway => match self {
                Self::TransferFailed(_) => {
                    "Failed to complete transaction. Please try again.".into()
                }
                Self::TransferUnconfirmed { .. } => {
                    "Your withdrawal is awaiting confirmation from the bank. \
                     The funds stay reserved until it settles."
                        .into()
                }
                Self::RecipientCreationFailed(_) => {
                    "Could not register your bank account for transfer. Please try again.".into()
                }
                _ => "The payment provider is unavailable. Please try again.".into(),
            },
            ErrorKind::Signature => "Invalid webhook signature".into(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            PaymentError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PaymentError::BankNotRegistered("u1".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PaymentError::TransferFailed("declined".into()).kind(),
            ErrorKind::Gateway
        );
        assert_eq!(
            PaymentError::InvalidWebhookSignature.kind(),
            ErrorKind::Signature
        );
    }

    #[test]
    fn test_status_codes() {
        let insufficient = PaymentError::InsufficientBalance {
            requested: Money::ngn(20_000),
            available: Money::ngn(15_000),
        };
        assert_eq!(insufficient.kind(), ErrorKind::Conflict);
        assert_eq!(insufficient.status_code(), 403);
        assert_eq!(PaymentError::BankNotRegistered("u".into()).status_code(), 404);
        assert_eq!(PaymentError::DuplicateReference("r".into()).status_code(), 409);
        assert_eq!(PaymentError::Provider("down".into()).status_code(), 502);
        assert_eq!(PaymentError::InvalidWebhookSignature.status_code(), 400);
    }

    #[test]
    fn test_retryable() {
        assert!(PaymentError::TransferFailed("x".into()).is_retryable());
        assert!(PaymentError::Network("reset".into()).is_transient());
        assert!(!PaymentError::Provider("bad key".into()).is_transient());
        assert!(!PaymentError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_unconfirmed_transfer_is_retryable_gateway_error() {
        let err = PaymentError::TransferUnconfirmed {
            reference: "pout_1".into(),
            message: "timed out".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Gateway);
        assert_eq!(err.status_code(), 504);
        assert!(err.is_retryable());
        assert!(err.public_message().contains("reserved"));
    }

    #[test]
    fn test_unrecorded_checkout_is_retryable() {
        let err = PaymentError::CheckoutNotRecorded {
            reference: "pin_1".into(),
            message: "pool exhausted at 10.0.0.3".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(!err.public_message().contains("10.0.0.3"));
        assert!(!PaymentError::Storage("x".into()).is_retryable());
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = PaymentError::Storage("connection pool exhausted at 10.0.0.3".into());
        assert!(!err.public_message().contains("10.0.0.3"));
        assert_eq!(err.kind().as_str(), "internal_error");
    }
}
