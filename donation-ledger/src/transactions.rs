//! Pay-in transaction lifecycle on top of a [`LedgerStore`]

use crate::store::{BalanceEffect, LedgerStore};
use donation_core::{
    Account, Money, PaymentError, PaymentResult, Reference, Transaction, TransactionStatus, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of applying a gateway event to a stored record
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    /// This call performed the transition
    Applied(T),
    /// The record was already in the target state; nothing changed
    AlreadyApplied(T),
}

impl<T> Settlement<T> {
    pub fn was_applied(&self) -> bool {
        matches!(self, Settlement::Applied(_))
    }

    pub fn record(&self) -> &T {
        match self {
            Settlement::Applied(r) | Settlement::AlreadyApplied(r) => r,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Settlement::Applied(r) | Settlement::AlreadyApplied(r) => r,
        }
    }
}

/// Transaction ledger
///
/// Owns the `pending -> complete | failed` state machine. Completion and the
/// balance credit are one conditional store operation keyed on
/// `(reference, pending)`, so redelivered confirmations are no-ops.
#[derive(Clone)]
pub struct TransactionLedger {
    store: Arc<dyn LedgerStore>,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Persist a new pending transaction
    pub async fn record_pending(&self, tx: Transaction) -> PaymentResult<Transaction> {
        if tx.status != TransactionStatus::Pending {
            return Err(PaymentError::Validation(format!(
                "new transaction {} must be pending, got {}",
                tx.reference, tx.status
            )));
        }
        if !tx.amount.is_positive() {
            return Err(PaymentError::InvalidAmount(tx.amount.to_string()));
        }

        self.store.insert_transaction(tx.clone()).await?;
        debug!(
            reference = %tx.reference,
            user_id = %tx.user_id,
            amount_minor = tx.amount.amount,
            "Recorded pending transaction"
        );
        Ok(tx)
    }

    /// Look up a transaction, failing with `TransactionNotFound`
    pub async fn get(&self, reference: &Reference) -> PaymentResult<Transaction> {
        self.store
            .transaction(reference)
            .await?
            .ok_or_else(|| PaymentError::TransactionNotFound(reference.to_string()))
    }

    pub async fn for_user(&self, user_id: &UserId) -> PaymentResult<Vec<Transaction>> {
        Ok(self.store.transactions_for(user_id).await?)
    }

    pub async fn account(&self, user_id: &UserId) -> PaymentResult<Account> {
        Ok(self.store.account(user_id).await?)
    }

    /// Mark a pending transaction complete and credit its owner.
    ///
    /// `confirmed` is the amount the gateway reports; a mismatch with the
    /// recorded amount changes nothing and yields a reconciliation error.
    pub async fn complete(
        &self,
        reference: &Reference,
        confirmed: Money,
    ) -> PaymentResult<Settlement<Transaction>> {
        let tx = self.get(reference).await?;
        if tx.amount != confirmed {
            return Err(PaymentError::Reconciliation {
                reference: reference.to_string(),
                message: format!(
                    "gateway confirmed {} but transaction records {}",
                    confirmed, tx.amount
                ),
            });
        }

        self.transition(
            reference,
            TransactionStatus::Complete,
            BalanceEffect::Credit,
        )
        .await
    }

    /// Mark a pending transaction failed; no balance effect
    pub async fn fail(&self, reference: &Reference) -> PaymentResult<Settlement<Transaction>> {
        self.transition(reference, TransactionStatus::Failed, BalanceEffect::None)
            .await
    }

    async fn transition(
        &self,
        reference: &Reference,
        next: TransactionStatus,
        effect: BalanceEffect,
    ) -> PaymentResult<Settlement<Transaction>> {
        let applied = self
            .store
            .settle_transaction(reference, TransactionStatus::Pending, next, effect)
            .await?;

        if let Some(tx) = applied {
            info!(
                reference = %reference,
                user_id = %tx.user_id,
                amount_minor = tx.amount.amount,
                status = %next,
                "Transaction settled"
            );
            return Ok(Settlement::Applied(tx));
        }

        // Lost the compare-and-set: someone else settled it first
        let current = self.get(reference).await?;
        if current.status == next {
            debug!(reference = %reference, status = %next, "Transaction already settled");
            Ok(Settlement::AlreadyApplied(current))
        } else {
            warn!(
                reference = %reference,
                from = %current.status,
                to = %next,
                "Rejected transaction transition"
            );
            Err(PaymentError::InvalidTransition {
                reference: reference.to_string(),
                from: current.status.to_string(),
                to: next.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLedger;
    use donation_core::ErrorKind;

    fn ledger() -> TransactionLedger {
        TransactionLedger::new(Arc::new(MemoryLedger::default()))
    }

    async fn seeded(ledger: &TransactionLedger, amount: i64) -> Transaction {
        let tx = Transaction::pending(Reference::pay_in(), UserId::new("u1"), Money::ngn(amount))
            .with_donor("donor@example.com");
        ledger.record_pending(tx).await.unwrap()
    }

    #[tokio::test]
    async fn test_complete_credits_owner() {
        let ledger = ledger();
        let tx = seeded(&ledger, 50_000).await;

        let outcome = ledger.complete(&tx.reference, Money::ngn(50_000)).await.unwrap();
        assert!(outcome.was_applied());
        assert_eq!(outcome.record().status, TransactionStatus::Complete);
        assert_eq!(
            outcome.record().donor_email.as_deref(),
            Some("donor@example.com")
        );

        let account = ledger.account(&UserId::new("u1")).await.unwrap();
        assert_eq!(account.available, Money::ngn(50_000));
    }

    #[tokio::test]
    async fn test_redelivery_is_noop() {
        let ledger = ledger();
        let tx = seeded(&ledger, 50_000).await;

        for _ in 0..3 {
            ledger.complete(&tx.reference, Money::ngn(50_000)).await.unwrap();
        }

        let outcome = ledger.complete(&tx.reference, Money::ngn(50_000)).await.unwrap();
        assert!(!outcome.was_applied());
        let account = ledger.account(&UserId::new("u1")).await.unwrap();
        assert_eq!(account.available, Money::ngn(50_000));
    }

    #[tokio::test]
    async fn test_amount_mismatch_changes_nothing() {
        let ledger = ledger();
        let tx = seeded(&ledger, 50_000).await;

        let err = ledger
            .complete(&tx.reference, Money::ngn(5_000_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reconciliation);

        let stored = ledger.get(&tx.reference).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert!(ledger.account(&UserId::new("u1")).await.unwrap().available.is_zero());
    }

    #[tokio::test]
    async fn test_failed_is_terminal() {
        let ledger = ledger();
        let tx = seeded(&ledger, 1_000).await;

        assert!(ledger.fail(&tx.reference).await.unwrap().was_applied());
        assert!(!ledger.fail(&tx.reference).await.unwrap().was_applied());

        let err = ledger
            .complete(&tx.reference, Money::ngn(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let ledger = ledger();
        let err = ledger
            .complete(&Reference::new("nope"), Money::ngn(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let ledger = ledger();
        let tx = Transaction::pending(Reference::pay_in(), UserId::new("u1"), Money::ngn(0));
        assert!(matches!(
            ledger.record_pending(tx).await,
            Err(PaymentError::InvalidAmount(_))
        ));
    }
}
