//! Payment orchestration for the donation platform
//!
//! Ties the gateway, the webhook receiver and the ledger together behind
//! three operations.
//!
//! ## Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      PaymentOrchestrator                       │
//! │   initiate_pay_in() | handle_webhook() | request_payout()      │
//! └───────────────────────────────────────────────────────────────┘
//!          │                     │                      │
//!          ▼                     ▼                      ▼
//!   ┌──────────────┐     ┌───────────────┐     ┌────────────────┐
//!   │ PaymentGateway│    │WebhookReceiver│     │ Transaction /  │
//!   │  (Paystack)  │     │ (HMAC-SHA512) │     │ Payout ledgers │
//!   └──────────────┘     └───────────────┘     └────────────────┘
//! ```
//!
//! Authentication happens once, at the boundary: an [`Authenticator`] turns
//! a bearer token into a [`RequestContext`], and the orchestrator trusts it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use donation_payments::{OrchestratorConfig, PaymentOrchestrator};
//!
//! let orchestrator = PaymentOrchestrator::new(
//!     OrchestratorConfig::new("whsec"),
//!     gateway,
//!     store,
//!     users,
//! );
//!
//! // Open a checkout for 500 NGN
//! let receipt = orchestrator.initiate_pay_in("ada@example.com", 500, None).await?;
//!
//! // Later, from the webhook endpoint
//! orchestrator.handle_webhook(&body, signature_header).await?;
//! ```

pub mod auth;
pub mod directory;
pub mod orchestrator;
pub mod recipients;
pub mod response;

pub use auth::{Authenticator, JwtAuthenticator, Principal, RequestContext};
pub use directory::{MemoryUserDirectory, UserDirectory};
pub use orchestrator::{
    OrchestratorConfig, PayInReceipt, PaymentOrchestrator, PayoutReceipt, WebhookOutcome,
};
pub use response::ApiResponse;
