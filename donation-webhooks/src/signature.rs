//! Webhook signature generation and verification
//!
//! The gateway signs the raw request body with HMAC-SHA512 keyed by the
//! shared secret and sends the hex digest in a header.

use crate::{Result, SignatureFault, WebhookError};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Webhook signature utilities
#[derive(Clone)]
pub struct WebhookSignature {
    secret: String,
}

impl std::fmt::Debug for WebhookSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignature")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookSignature {
    /// Create a new signature utility with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex HMAC-SHA512 of the payload
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.mac(payload).finalize().into_bytes())
    }

    /// Verify a hex signature against the payload.
    ///
    /// Accepts either hex case. The digest comparison is constant-time.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<()> {
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(WebhookError::Unsigned);
        }

        let provided = hex::decode(signature)
            .map_err(|_| WebhookError::Forged(SignatureFault::NotHex))?;
        if provided.len() != 64 {
            return Err(WebhookError::Forged(SignatureFault::WrongLength(provided.len())));
        }

        self.mac(payload)
            .verify_slice(&provided)
            .map_err(|_| WebhookError::Forged(SignatureFault::DigestMismatch))
    }

    fn mac(&self, payload: &[u8]) -> HmacSha512 {
        let mut mac =
            HmacSha512::new_from_slice(self.secret.as_bytes()).expect("HMAC can take any size key");
        mac.update(payload);
        mac
    }
}

/// Header names for webhook signatures
pub mod headers {
    /// Paystack signature header
    pub const SIGNATURE: &str = "x-paystack-signature";
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = WebhookSignature::new("sk_test_secret");
        let payload = br#"{"event":"charge.success"}"#;

        let signature = signer.sign(payload);
        assert_eq!(signature.len(), 128);
        assert!(signer.verify(payload, &signature).is_ok());
        assert!(signer.verify(payload, &signature.to_uppercase()).is_ok());
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA512("key", "The quick brown fox jumps over the lazy dog")
        let signer = WebhookSignature::new("key");
        assert_eq!(
            signer.sign(b"The quick brown fox jumps over the lazy dog"),
            "b42af09057bac1e2d41708e48a902e09b5ff7f12ab428a4fe86653c73dd248fb\
             82f948a549f7b791a5b41915ee4d1ec3935357e4e2317250d0372afa2ebeeb3a"
        );
    }

    #[test]
    fn test_verify_wrong_secret() {
        let payload = b"payload";
        let signature = WebhookSignature::new("secret1").sign(payload);

        assert!(matches!(
            WebhookSignature::new("secret2").verify(payload, &signature),
            Err(WebhookError::Forged(_))
        ));
    }

    #[test]
    fn test_verify_non_hex() {
        let signer = WebhookSignature::new("secret");
        assert!(matches!(
            signer.verify(b"payload", "zz-not-hex"),
            Err(WebhookError::Forged(_))
        ));
    }

    #[test]
    fn test_verify_truncated_signature() {
        let signer = WebhookSignature::new("secret");
        let signature = signer.sign(b"payload");

        assert_eq!(
            signer.verify(b"payload", &signature[..64]),
            Err(WebhookError::Forged(SignatureFault::WrongLength(32)))
        );
    }

    #[test]
    fn test_verify_empty_signature() {
        let signer = WebhookSignature::new("secret");
        assert!(matches!(
            signer.verify(b"payload", "  "),
            Err(WebhookError::Unsigned)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = WebhookSignature::new("sk_live_very_secret");
        assert!(!format!("{:?}", signer).contains("very_secret"));
    }

    proptest! {
        #[test]
        fn prop_tampered_payload_is_rejected(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let signer = WebhookSignature::new("sk_test_prop");
            let signature = signer.sign(&payload);

            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;

            prop_assert!(signer.verify(&tampered, &signature).is_err());
        }
    }
}
