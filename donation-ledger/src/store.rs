//! Storage contract for transactions, payouts and balances

use crate::error::LedgerResult;
use async_trait::async_trait;
use donation_core::{
    Account, Money, PayoutAttempt, PayoutStatus, Reference, Transaction, TransactionStatus, UserId,
};

/// Balance change applied in the same atomic step as a status transition.
///
/// The amount and the owning user always come from the stored record, never
/// from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    /// Status only
    None,
    /// `available += amount`
    Credit,
    /// `held -= amount` (funds leave the platform)
    Capture,
    /// `held -= amount; available += amount`
    Release,
}

/// Extra fields recorded with a payout transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutUpdate {
    pub transfer_code: Option<String>,
    pub failure_reason: Option<String>,
}

impl PayoutUpdate {
    pub fn transfer_code(code: impl Into<String>) -> Self {
        Self {
            transfer_code: Some(code.into()),
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            transfer_code: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Persistence for the ledger.
///
/// Implementations must make every method atomic: a conditional transition
/// and its balance effect either both happen or neither does. Conditional
/// methods return `Ok(None)` when the stored status differs from `expected`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new transaction; fails with `Duplicate` if the reference exists
    async fn insert_transaction(&self, tx: Transaction) -> LedgerResult<()>;

    async fn transaction(&self, reference: &Reference) -> LedgerResult<Option<Transaction>>;

    /// Transactions owned by a user, newest first
    async fn transactions_for(&self, user_id: &UserId) -> LedgerResult<Vec<Transaction>>;

    /// Move `expected -> next` and apply `effect` to the owner's account
    async fn settle_transaction(
        &self,
        reference: &Reference,
        expected: TransactionStatus,
        next: TransactionStatus,
        effect: BalanceEffect,
    ) -> LedgerResult<Option<Transaction>>;

    /// Current account; an unknown user has an empty account
    async fn account(&self, user_id: &UserId) -> LedgerResult<Account>;

    /// Unconditional `available += amount`
    async fn credit(&self, user_id: &UserId, amount: Money) -> LedgerResult<Account>;

    /// Move `attempt.amount` from available to held and store the attempt.
    ///
    /// Fails with `InsufficientFunds` (nothing stored) when available is short.
    async fn insert_payout(&self, attempt: PayoutAttempt) -> LedgerResult<Account>;

    async fn payout(&self, reference: &Reference) -> LedgerResult<Option<PayoutAttempt>>;

    /// Payouts owned by a user, newest first
    async fn payouts_for(&self, user_id: &UserId) -> LedgerResult<Vec<PayoutAttempt>>;

    /// Move the payout `expected -> next` and apply `effect` to its hold
    async fn settle_payout(
        &self,
        reference: &Reference,
        expected: PayoutStatus,
        next: PayoutStatus,
        effect: BalanceEffect,
        update: PayoutUpdate,
    ) -> LedgerResult<Option<PayoutAttempt>>;
}
