//! Payout lifecycle: hold, then capture or release

use crate::store::{BalanceEffect, LedgerStore, PayoutUpdate};
use crate::transactions::Settlement;
use donation_core::{
    Account, PaymentError, PaymentResult, PayoutAttempt, PayoutStatus, Reference, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Payout ledger
///
/// A payout reserves funds with an atomic hold before any transfer is issued.
/// The hold is captured (debited) only once the gateway confirms the
/// transfer, and released back to `available` when it fails.
#[derive(Clone)]
pub struct PayoutLedger {
    store: Arc<dyn LedgerStore>,
}

impl PayoutLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Reserve `attempt.amount` and record the attempt as `held`
    pub async fn hold(&self, attempt: PayoutAttempt) -> PaymentResult<Account> {
        if attempt.status != PayoutStatus::Held {
            return Err(PaymentError::Validation(format!(
                "new payout {} must be held, got {}",
                attempt.reference, attempt.status
            )));
        }
        if !attempt.amount.is_positive() {
            return Err(PaymentError::InvalidAmount(attempt.amount.to_string()));
        }

        let reference = attempt.reference.clone();
        let amount = attempt.amount;
        let account = self.store.insert_payout(attempt).await?;
        debug!(
            reference = %reference,
            amount_minor = amount.amount,
            available_minor = account.available.amount,
            held_minor = account.held.amount,
            "Placed payout hold"
        );
        Ok(account)
    }

    pub async fn get(&self, reference: &Reference) -> PaymentResult<PayoutAttempt> {
        self.store
            .payout(reference)
            .await?
            .ok_or_else(|| PaymentError::PayoutNotFound(reference.to_string()))
    }

    pub async fn for_user(&self, user_id: &UserId) -> PaymentResult<Vec<PayoutAttempt>> {
        Ok(self.store.payouts_for(user_id).await?)
    }

    /// Transfer issued but not yet confirmed; funds stay held
    pub async fn mark_processing(
        &self,
        reference: &Reference,
        transfer_code: impl Into<String>,
    ) -> PaymentResult<Settlement<PayoutAttempt>> {
        self.settle(
            reference,
            &[PayoutStatus::Held],
            PayoutStatus::Processing,
            BalanceEffect::None,
            PayoutUpdate::transfer_code(transfer_code),
        )
        .await
    }

    /// Transfer call ended without an answer; funds stay held until a
    /// `transfer.*` outcome settles it
    pub async fn mark_unconfirmed(
        &self,
        reference: &Reference,
    ) -> PaymentResult<Settlement<PayoutAttempt>> {
        self.settle(
            reference,
            &[PayoutStatus::Held],
            PayoutStatus::Processing,
            BalanceEffect::None,
            PayoutUpdate::default(),
        )
        .await
    }

    /// Transfer confirmed: debit the held funds
    pub async fn capture(
        &self,
        reference: &Reference,
        transfer_code: Option<String>,
    ) -> PaymentResult<Settlement<PayoutAttempt>> {
        let update = PayoutUpdate {
            transfer_code,
            failure_reason: None,
        };
        self.settle(
            reference,
            &[PayoutStatus::Held, PayoutStatus::Processing],
            PayoutStatus::Succeeded,
            BalanceEffect::Capture,
            update,
        )
        .await
    }

    /// Transfer failed or was reversed: return the held funds
    pub async fn release(
        &self,
        reference: &Reference,
        reason: impl Into<String>,
    ) -> PaymentResult<Settlement<PayoutAttempt>> {
        self.settle(
            reference,
            &[PayoutStatus::Held, PayoutStatus::Processing],
            PayoutStatus::Failed,
            BalanceEffect::Release,
            PayoutUpdate::failure(reason),
        )
        .await
    }

    async fn settle(
        &self,
        reference: &Reference,
        from: &[PayoutStatus],
        next: PayoutStatus,
        effect: BalanceEffect,
        update: PayoutUpdate,
    ) -> PaymentResult<Settlement<PayoutAttempt>> {
        for expected in from {
            let applied = self
                .store
                .settle_payout(reference, *expected, next, effect, update.clone())
                .await?;
            if let Some(attempt) = applied {
                info!(
                    reference = %reference,
                    user_id = %attempt.user_id,
                    amount_minor = attempt.amount.amount,
                    from = %expected,
                    to = %next,
                    "Payout settled"
                );
                return Ok(Settlement::Applied(attempt));
            }
        }

        let current = self.get(reference).await?;
        if current.status == next {
            Ok(Settlement::AlreadyApplied(current))
        } else {
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
    use donation_core::{ErrorKind, Money, Recipient};

    fn user() -> UserId {
        UserId::new("u1")
    }

    async fn funded(amount: i64) -> (Arc<MemoryLedger>, PayoutLedger) {
        let store = Arc::new(MemoryLedger::default());
        store.credit(&user(), Money::ngn(amount)).await.unwrap();
        let ledger = PayoutLedger::new(store.clone());
        (store, ledger)
    }

    fn attempt(amount: i64) -> PayoutAttempt {
        PayoutAttempt::held(
            Reference::payout(),
            user(),
            Money::ngn(amount),
            Recipient {
                recipient_code: "RCP_x".into(),
                account_number: "0000000000".into(),
                account_name: "Test".into(),
                bank_code: "044".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_hold_then_async_success() {
        let (store, ledger) = funded(15_000).await;
        let attempt = attempt(10_000);
        ledger.hold(attempt.clone()).await.unwrap();

        let processing = ledger
            .mark_processing(&attempt.reference, "TRF_9")
            .await
            .unwrap();
        assert_eq!(processing.record().status, PayoutStatus::Processing);

        // Balance is unchanged while the transfer is in flight
        assert_eq!(store.account(&user()).await.unwrap().balance(), Money::ngn(15_000));

        let done = ledger.capture(&attempt.reference, None).await.unwrap();
        assert!(done.was_applied());
        assert_eq!(done.record().transfer_code.as_deref(), Some("TRF_9"));

        let account = store.account(&user()).await.unwrap();
        assert_eq!(account.balance(), Money::ngn(5_000));
        assert!(account.held.is_zero());
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_keeps_funds_held() {
        let (store, ledger) = funded(15_000).await;
        let attempt = attempt(10_000);
        ledger.hold(attempt.clone()).await.unwrap();

        let settled = ledger.mark_unconfirmed(&attempt.reference).await.unwrap();
        assert_eq!(settled.record().status, PayoutStatus::Processing);
        assert!(settled.record().transfer_code.is_none());

        let account = store.account(&user()).await.unwrap();
        assert_eq!(account.available, Money::ngn(5_000));
        assert_eq!(account.held, Money::ngn(10_000));

        // A late outcome still settles it
        let done = ledger
            .capture(&attempt.reference, Some("TRF_late".into()))
            .await
            .unwrap();
        assert!(done.was_applied());
        assert_eq!(store.account(&user()).await.unwrap().balance(), Money::ngn(5_000));
    }

    #[tokio::test]
    async fn test_repeated_capture_debits_once() {
        let (store, ledger) = funded(15_000).await;
        let attempt = attempt(10_000);
        ledger.hold(attempt.clone()).await.unwrap();

        assert!(ledger.capture(&attempt.reference, None).await.unwrap().was_applied());
        assert!(!ledger.capture(&attempt.reference, None).await.unwrap().was_applied());
        assert_eq!(store.account(&user()).await.unwrap().balance(), Money::ngn(5_000));
    }

    #[tokio::test]
    async fn test_release_after_capture_is_rejected() {
        let (_store, ledger) = funded(15_000).await;
        let attempt = attempt(10_000);
        ledger.hold(attempt.clone()).await.unwrap();
        ledger.capture(&attempt.reference, None).await.unwrap();

        let err = ledger
            .release(&attempt.reference, "reversed")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_hold_beyond_available() {
        let (_store, ledger) = funded(150).await;
        let err = ledger.hold(attempt(200)).await.unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_release_restores_balance() {
        let (store, ledger) = funded(150).await;
        let attempt = attempt(100);
        ledger.hold(attempt.clone()).await.unwrap();

        let released = ledger.release(&attempt.reference, "declined").await.unwrap();
        assert_eq!(released.record().status, PayoutStatus::Failed);

        let account = store.account(&user()).await.unwrap();
        assert_eq!(account.available, Money::ngn(150));
        assert_eq!(ledger.for_user(&user()).await.unwrap().len(), 1);
    }
}
