//! Webhook intake failures

use donation_core::PaymentError;
use thiserror::Error;

/// Why a presented signature was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFault {
    NotHex,
    /// Decoded to the wrong number of bytes for SHA-512
    WrongLength(usize),
    DigestMismatch,
}

impl std::fmt::Display for SignatureFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotHex => f.write_str("not hex encoded"),
            Self::WrongLength(len) => write!(f, "{} bytes, expected 64", len),
            Self::DigestMismatch => f.write_str("digest does not match body"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook carries no signature")]
    Unsigned,

    #[error("webhook signature rejected: {0}")]
    Forged(SignatureFault),

    #[error("webhook body is {size} bytes, over the {limit} byte limit")]
    Oversized { size: usize, limit: usize },

    /// Signed, but not a gateway event
    #[error("webhook body is not a gateway event: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WebhookError>;

impl From<WebhookError> for PaymentError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Unsigned => PaymentError::WebhookSignatureMissing,
            WebhookError::Forged(_) => PaymentError::InvalidWebhookSignature,
            other => PaymentError::Validation(other.to_string()),
        }
    }
}
