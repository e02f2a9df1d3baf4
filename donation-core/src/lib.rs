//! Domain vocabulary for the donation platform payment core.
//!
//! ## Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Money / Currency   major <-> minor unit conversion            │
//! │  UserId / Reference identifiers, UUID-backed references        │
//! │  Transaction        pay-in lifecycle (pending -> terminal)     │
//! │  PayoutAttempt      withdrawal lifecycle (held -> terminal)    │
//! │  Account            available + held balance                   │
//! │  PaymentError       error taxonomy with stable ErrorKind       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every other crate in the workspace builds on these types; none of them
//! performs I/O.

pub mod account;
pub mod error;
pub mod ids;
pub mod money;
pub mod payout;
pub mod transaction;

pub use account::*;
pub use error::*;
pub use ids::*;
pub use money::*;
pub use payout::*;
pub use transaction::*;
