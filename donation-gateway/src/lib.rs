//! Payment gateway client for the donation platform
//!
//! [`PaymentGateway`] is the contract the payment orchestrator depends on.
//! [`PaystackGateway`] talks to the Paystack REST API over `reqwest` with a
//! bounded per-request timeout; [`Retrying`] adds backoff for the calls that
//! are safe to repeat, and [`BankDirectory`] caches the bank list.
//!
//! # Examples
//!
//! ```no_run
//! use donation_core::{Money, Reference};
//! use donation_gateway::{ChargeRequest, PaymentGateway, PaystackGateway, RetryPolicy, Retrying};
//! use std::time::Duration;
//!
//! # async fn example() -> donation_core::PaymentResult<()> {
//! let gateway = Retrying::new(
//!     PaystackGateway::new("sk_test_xxx", Duration::from_secs(15))?,
//!     RetryPolicy::default(),
//! );
//!
//! let checkout = gateway
//!     .initialize_charge(ChargeRequest::new(
//!         Money::ngn(50_000),
//!         "donor@example.com",
//!         Reference::pay_in(),
//!     ))
//!     .await?;
//! println!("redirect to {}", checkout.authorization_url);
//! # Ok(())
//! # }
//! ```

pub mod banks;
pub mod mock;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod types;

pub use banks::BankDirectory;
pub use mock::{Fault, GatewayOp, MockGateway};
pub use provider::{PaymentGateway, ProviderClient};
pub use retry::{RetryPolicy, Retrying};
pub use types::*;

#[cfg(feature = "paystack")]
pub use providers::{PAYSTACK_BASE_URL, PaystackGateway};
