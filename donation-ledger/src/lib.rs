//! Ledger for the donation platform
//!
//! The [`LedgerStore`] trait is the storage contract: conditional updates,
//! point reads and atomic balance changes. Every status change that moves
//! money is paired with its balance effect inside one store call, which makes
//! the compare-and-set on the record status the idempotency boundary.
//!
//! ```text
//! TransactionLedger ─┐
//!                    ├──► Arc<dyn LedgerStore> ──► MemoryLedger
//! PayoutLedger ──────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use donation_core::{Money, Reference, Transaction, UserId};
//! use donation_ledger::{MemoryLedger, TransactionLedger};
//! use std::sync::Arc;
//!
//! # async fn example() -> donation_core::PaymentResult<()> {
//! let ledger = TransactionLedger::new(Arc::new(MemoryLedger::default()));
//! let tx = Transaction::pending(Reference::pay_in(), UserId::new("u1"), Money::ngn(50_000));
//! let reference = tx.reference.clone();
//!
//! ledger.record_pending(tx).await?;
//! ledger.complete(&reference, Money::ngn(50_000)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod payouts;
pub mod store;
pub mod transactions;

pub use error::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use payouts::PayoutLedger;
pub use store::{BalanceEffect, LedgerStore, PayoutUpdate};
pub use transactions::{Settlement, TransactionLedger};
