//! Receiver for incoming gateway webhooks

use crate::{Result, WebhookError, WebhookEvent, WebhookSignature};
use tracing::{debug, warn};

/// Default body size limit
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Receiver for incoming webhooks
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    signature: WebhookSignature,
    max_payload_bytes: usize,
}

impl WebhookReceiver {
    /// Create a new receiver with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            signature: WebhookSignature::new(secret),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Set the body size limit
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }

    /// Verify the signature over the raw body, then parse it.
    ///
    /// Nothing is parsed before the signature checks out.
    pub fn receive(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookEvent> {
        if payload.len() > self.max_payload_bytes {
            warn!(
                size = payload.len(),
                limit = self.max_payload_bytes,
                "Rejected oversized webhook"
            );
            return Err(WebhookError::Oversized {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        let signature = signature.ok_or_else(|| {
            warn!("Rejected webhook without signature");
            WebhookError::Unsigned
        })?;

        if let Err(err) = self.signature.verify(payload, signature) {
            warn!(error = %err, "Rejected webhook with invalid signature");
            return Err(err);
        }

        let event: WebhookEvent = serde_json::from_slice(payload)?;
        debug!(event = %event.event, reference = %event.data.reference, "Webhook verified");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebhookEventType;

    const SECRET: &str = "sk_test_receiver";

    fn body() -> Vec<u8> {
        br#"{"event":"charge.success","data":{"reference":"pin_1","amount":50000,"currency":"NGN"}}"#
            .to_vec()
    }

    #[test]
    fn test_receive_valid() {
        let receiver = WebhookReceiver::new(SECRET);
        let signature = WebhookSignature::new(SECRET).sign(&body());

        let event = receiver.receive(&body(), Some(&signature)).unwrap();
        assert_eq!(event.event, WebhookEventType::ChargeSuccess);
    }

    #[test]
    fn test_missing_signature() {
        let receiver = WebhookReceiver::new(SECRET);
        assert_eq!(
            receiver.receive(&body(), None),
            Err(WebhookError::Unsigned)
        );
    }

    #[test]
    fn test_tampered_body() {
        let receiver = WebhookReceiver::new(SECRET);
        let signature = WebhookSignature::new(SECRET).sign(&body());
        let tampered = String::from_utf8(body())
            .unwrap()
            .replace("50000", "5000000")
            .into_bytes();

        assert!(matches!(
            receiver.receive(&tampered, Some(&signature)),
            Err(WebhookError::Forged(_))
        ));
    }

    #[test]
    fn test_oversized_body_rejected_before_verification() {
        let receiver = WebhookReceiver::new(SECRET).with_max_payload(10);
        assert!(matches!(
            receiver.receive(&body(), None),
            Err(WebhookError::Oversized { .. })
        ));
    }

    #[test]
    fn test_signed_garbage_is_payload_error() {
        let receiver = WebhookReceiver::new(SECRET);
        let garbage = b"not json";
        let signature = WebhookSignature::new(SECRET).sign(garbage);

        assert!(matches!(
            receiver.receive(garbage, Some(&signature)),
            Err(WebhookError::Malformed(_))
        ));
    }
}
