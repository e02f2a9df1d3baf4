//! Caller-facing response envelope

use donation_core::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};

/// `{ success, kind, message, data }`
///
/// Errors carry their stable kind and a public message only; driver and
/// storage details never reach the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// HTTP-equivalent status
    #[serde(skip)]
    pub status: u16,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            kind: None,
            message: message.into(),
            retryable: false,
            data: Some(data),
            status: 200,
        }
    }

    pub fn error(err: &PaymentError) -> Self {
        Self {
            success: false,
            kind: Some(err.kind().as_str().to_string()),
            message: err.public_message(),
            retryable: err.is_retryable(),
            data: None,
            status: err.status_code(),
        }
    }

    pub fn from_result(result: PaymentResult<T>, message: impl Into<String>) -> Self {
        match result {
            Ok(data) => Self::ok(data, message),
            Err(err) => Self::error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donation_core::Money;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let response = ApiResponse::ok(json!({"reference": "pin_1"}), "Payment initialized");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["reference"], "pin_1");
        assert!(value.get("kind").is_none());
        assert!(value.get("status").is_none());
    }

    #[test]
    fn test_error_shape() {
        let err = PaymentError::InsufficientBalance {
            requested: Money::ngn(20_000),
            available: Money::ngn(15_000),
        };
        let response: ApiResponse<()> = ApiResponse::error(&err);

        assert!(!response.success);
        assert_eq!(response.kind.as_deref(), Some("conflict_error"));
        assert_eq!(response.status, 403);
        assert!(!response.retryable);
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = PaymentError::Storage("connection refused at 10.0.0.3:27017".into());
        let response: ApiResponse<()> = ApiResponse::from_result(Err(err), "unused");

        assert_eq!(response.kind.as_deref(), Some("internal_error"));
        assert!(!response.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_gateway_errors_are_retryable() {
        let response: ApiResponse<()> = ApiResponse::error(&PaymentError::Timeout);
        assert!(response.retryable);
        assert_eq!(response.kind.as_deref(), Some("gateway_error"));
    }
}
