//! In-memory ledger store

use crate::error::{LedgerError, LedgerResult};
use crate::store::{BalanceEffect, LedgerStore, PayoutUpdate};
use async_trait::async_trait;
use chrono::Utc;
use donation_core::{
    Account, Currency, Money, PayoutAttempt, PayoutStatus, Reference, Transaction,
    TransactionStatus, UserId,
};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct State {
    transactions: HashMap<Reference, Transaction>,
    payouts: HashMap<Reference, PayoutAttempt>,
    accounts: HashMap<UserId, Account>,
}

/// Ledger store backed by process memory.
///
/// One mutex guards all three tables so that every method, including a status
/// change paired with a balance change, is a single critical section.
pub struct MemoryLedger {
    currency: Currency,
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            state: Mutex::new(State::default()),
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    fn check_currency(&self, amount: Money) -> LedgerResult<()> {
        if amount.currency != self.currency {
            return Err(LedgerError::CurrencyMismatch(format!(
                "ledger holds {}, got {}",
                self.currency, amount.currency
            )));
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

/// Compute the account after `effect`; the caller commits it only on success.
fn apply_effect(account: Account, amount: Money, effect: BalanceEffect) -> LedgerResult<Account> {
    let overflow = || LedgerError::InvariantViolation("balance overflow".to_string());
    let negative = |what: &str| {
        LedgerError::InvariantViolation(format!("{} would go negative", what))
    };

    let mut next = account;
    match effect {
        BalanceEffect::None => {}
        BalanceEffect::Credit => {
            next.available = account.available.checked_add(amount).ok_or_else(overflow)?;
        }
        BalanceEffect::Capture => {
            next.held = account
                .held
                .checked_sub(amount)
                .filter(|m| m.amount >= 0)
                .ok_or_else(|| negative("held"))?;
        }
        BalanceEffect::Release => {
            next.held = account
                .held
                .checked_sub(amount)
                .filter(|m| m.amount >= 0)
                .ok_or_else(|| negative("held"))?;
            next.available = account.available.checked_add(amount).ok_or_else(overflow)?;
        }
    }
    Ok(next)
}

fn newest_first<T>(mut items: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    items
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn insert_transaction(&self, tx: Transaction) -> LedgerResult<()> {
        self.check_currency(tx.amount)?;
        let mut state = self.state.lock();
        if state.transactions.contains_key(&tx.reference) {
            return Err(LedgerError::Duplicate(tx.reference.to_string()));
        }
        state.transactions.insert(tx.reference.clone(), tx);
        Ok(())
    }

    async fn transaction(&self, reference: &Reference) -> LedgerResult<Option<Transaction>> {
        Ok(self.state.lock().transactions.get(reference).cloned())
    }

    async fn transactions_for(&self, user_id: &UserId) -> LedgerResult<Vec<Transaction>> {
        let items = self
            .state
            .lock()
            .transactions
            .values()
            .filter(|tx| &tx.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |tx: &Transaction| tx.created_at))
    }

    async fn settle_transaction(
        &self,
        reference: &Reference,
        expected: TransactionStatus,
        next: TransactionStatus,
        effect: BalanceEffect,
    ) -> LedgerResult<Option<Transaction>> {
        let mut state = self.state.lock();
        let State {
            transactions,
            accounts,
            ..
        } = &mut *state;

        let tx = transactions
            .get_mut(reference)
            .ok_or_else(|| LedgerError::TransactionNotFound(reference.to_string()))?;
        if tx.status != expected {
            return Ok(None);
        }

        let current = accounts
            .get(&tx.user_id)
            .copied()
            .unwrap_or_else(|| Account::empty(self.currency));
        let updated = apply_effect(current, tx.amount, effect)?;

        tx.status = next;
        tx.updated_at = Utc::now();
        accounts.insert(tx.user_id.clone(), updated);
        Ok(Some(tx.clone()))
    }

    async fn account(&self, user_id: &UserId) -> LedgerResult<Account> {
        Ok(self
            .state
            .lock()
            .accounts
            .get(user_id)
            .copied()
            .unwrap_or_else(|| Account::empty(self.currency)))
    }

    async fn credit(&self, user_id: &UserId, amount: Money) -> LedgerResult<Account> {
        self.check_currency(amount)?;
        let mut state = self.state.lock();
        let account = state
            .accounts
            .entry(user_id.clone())
            .or_insert_with(|| Account::empty(self.currency));
        *account = apply_effect(*account, amount, BalanceEffect::Credit)?;
        Ok(*account)
    }

    async fn insert_payout(&self, attempt: PayoutAttempt) -> LedgerResult<Account> {
        self.check_currency(attempt.amount)?;
        let mut state = self.state.lock();
        if state.payouts.contains_key(&attempt.reference) {
            return Err(LedgerError::Duplicate(attempt.reference.to_string()));
        }

        let current = state
            .accounts
            .get(&attempt.user_id)
            .copied()
            .unwrap_or_else(|| Account::empty(self.currency));
        if current.available.amount < attempt.amount.amount {
            return Err(LedgerError::InsufficientFunds {
                requested: attempt.amount,
                available: current.available,
            });
        }

        let updated = Account {
            available: Money::new(current.available.amount - attempt.amount.amount, self.currency),
            held: current
                .held
                .checked_add(attempt.amount)
                .ok_or_else(|| LedgerError::InvariantViolation("balance overflow".to_string()))?,
        };

        state.accounts.insert(attempt.user_id.clone(), updated);
        state.payouts.insert(attempt.reference.clone(), attempt);
        Ok(updated)
    }

    async fn payout(&self, reference: &Reference) -> LedgerResult<Option<PayoutAttempt>> {
        Ok(self.state.lock().payouts.get(reference).cloned())
    }

    async fn payouts_for(&self, user_id: &UserId) -> LedgerResult<Vec<PayoutAttempt>> {
        let items = self
            .state
            .lock()
            .payouts
            .values()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |p: &PayoutAttempt| p.created_at))
    }

    async fn settle_payout(
        &self,
        reference: &Reference,
        expected: PayoutStatus,
        next: PayoutStatus,
        effect: BalanceEffect,
        update: PayoutUpdate,
    ) -> LedgerResult<Option<PayoutAttempt>> {
        let mut state = self.state.lock();
        let State {
            payouts, accounts, ..
        } = &mut *state;

        let attempt = payouts
            .get_mut(reference)
            .ok_or_else(|| LedgerError::PayoutNotFound(reference.to_string()))?;
        if attempt.status != expected {
            return Ok(None);
        }

        let current = accounts
            .get(&attempt.user_id)
            .copied()
            .unwrap_or_else(|| Account::empty(self.currency));
        let updated = apply_effect(current, attempt.amount, effect)?;

        attempt.status = next;
        attempt.updated_at = Utc::now();
        if update.transfer_code.is_some() {
            attempt.transfer_code = update.transfer_code;
        }
        if update.failure_reason.is_some() {
            attempt.failure_reason = update.failure_reason;
        }
        accounts.insert(attempt.user_id.clone(), updated);
        Ok(Some(attempt.clone()))
    }
}
