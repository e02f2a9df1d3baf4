//! Gateway webhook verification for the donation platform
//!
//! Incoming webhooks are authenticated with a hex HMAC-SHA512 of the raw body
//! (header [`headers::SIGNATURE`]) and only then parsed into a typed
//! [`WebhookEvent`].
//!
//! # Examples
//!
//! ```
//! use donation_webhooks::{WebhookReceiver, WebhookSignature, WebhookEventType};
//!
//! let body = br#"{"event":"charge.success","data":{"reference":"pin_1","amount":50000}}"#;
//! let signature = WebhookSignature::new("sk_test").sign(body);
//!
//! let event = WebhookReceiver::new("sk_test")
//!     .receive(body, Some(&signature))
//!     .unwrap();
//! assert_eq!(event.event, WebhookEventType::ChargeSuccess);
//! ```

mod error;
mod event;
mod receiver;
mod signature;

pub use error::{Result, SignatureFault, WebhookError};
pub use event::{Customer, EventData, WebhookEvent, WebhookEventType};
pub use receiver::{DEFAULT_MAX_PAYLOAD_BYTES, WebhookReceiver};
pub use signature::{WebhookSignature, headers};
